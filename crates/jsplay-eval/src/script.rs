//! Compiled scripts: parse once, run in an isolated function scope.

use std::rc::Rc;

use jsplay_parser::parse_source;
use jsplay_types::ast::Program;
use jsplay_types::SourceFile;

use crate::error::{EvalResult, SyntaxError};
use crate::interpreter::{Interpreter, Limits};
use crate::realm::Realm;
use crate::value::Value;

/// Default file name used in compile errors.
pub const DEFAULT_SCRIPT_NAME: &str = "playground.js";

/// A parsed script, ready to run.
///
/// Each run gets a fresh function scope: `let`, `const`, `var` and function
/// declarations stay local to that run, and a top-level `return` ends it.
#[derive(Debug)]
pub struct Script {
    program: Program,
    source: Rc<SourceFile>,
}

impl Script {
    /// Parse `source`, failing with the first syntax error.
    pub fn compile(source: &str) -> Result<Self, SyntaxError> {
        Self::compile_named(DEFAULT_SCRIPT_NAME, source)
    }

    pub fn compile_named(name: &str, source: &str) -> Result<Self, SyntaxError> {
        let file = SourceFile::new(name, source);
        let result = parse_source(&file);
        if result.errors.has_errors() {
            tracing::debug!(
                errors = result.errors.total_errors,
                "script failed to compile"
            );
            return Err(SyntaxError::new(result.errors));
        }
        Ok(Self {
            program: result.program,
            source: Rc::new(file),
        })
    }

    pub fn source(&self) -> &str {
        &self.source.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Run the script once; the value of a top-level `return`, else `undefined`.
    pub fn run(&self, realm: &Realm, limits: Limits) -> EvalResult<Value> {
        let mut interp = Interpreter::new(realm, Rc::clone(&self.source), limits);
        let result = interp.run_program(realm.globals(), &self.program.body);
        tracing::debug!(steps = interp.steps(), ok = result.is_ok(), "script finished");
        result
    }
}
