//! Runtime error types for the jsplay evaluator.

use jsplay_types::CompileErrors;
use thiserror::Error;

use crate::value::Value;

/// Evaluation error: a thrown script value, an engine limit, or a
/// control-flow signal unwinding to its enclosing construct.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// A `throw` (or a runtime error raised by the engine) that no `catch` handled.
    #[error("uncaught exception: {0:?}")]
    Thrown(Value),
    /// The step budget ran out. Not catchable from script code.
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
    /// `return` statement (used internally for control flow)
    #[error("return outside of a function")]
    Return(Value),
    /// `break` (used internally for control flow)
    #[error("break outside of a loop or switch")]
    Break,
    /// `continue` (used internally for control flow)
    #[error("continue outside of a loop")]
    Continue,
    /// A nullish `?.` link; caught at the top of the optional chain.
    #[error("optional chain short-circuited")]
    ShortCircuit,
}

impl EvalError {
    /// The thrown value, if this error is a script exception.
    pub fn thrown(&self) -> Option<&Value> {
        match self {
            EvalError::Thrown(value) => Some(value),
            _ => None,
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

/// A script that failed to lex or parse.
///
/// Displays as the first error's message, which is what the playground shows.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub errors: CompileErrors,
}

impl SyntaxError {
    pub fn new(errors: CompileErrors) -> Self {
        let message = errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "Invalid or unexpected token".to_string());
        Self { message, errors }
    }
}
