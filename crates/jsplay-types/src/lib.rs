//! Shared types for the jsplay interpreter.
//!
//! This crate defines the AST node types, source spans and compile error
//! types used by the lexer, the parser and the evaluator.

mod error;
mod span;
pub mod ast;

pub use error::{CompileErrors, ErrorCategory, ErrorCode, ScriptError, Severity, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used by the compile stages.
pub type Result<T> = std::result::Result<T, ScriptError>;
