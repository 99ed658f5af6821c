//! jsplay tree-walking evaluator.
//!
//! Runs parsed scripts against a [`Realm`] of global bindings. Scripts are
//! compiled once with [`Script::compile`] and run with [`Script::run`]; each
//! run gets its own function scope, so `let`/`const`/`var` declarations never
//! leak between runs, while mutations of globals such as `console` do.
//!
//! Values are reference-counted: objects, arrays, functions and errors are
//! shared through [`ObjectRef`]. Runaway scripts are bounded by an optional
//! step budget and a call-depth limit (see [`Limits`]); deep recursion of any
//! kind runs on a growable stack and ends in a `RangeError`, never a host
//! stack overflow.

pub mod builtins;
mod env;
mod error;
mod exec;
mod interpreter;
pub mod number;
mod realm;
mod script;
mod stack;
mod value;

pub use builtins::console::{format_line, ConsoleLevel, ConsoleSink, TracingConsole, CONSOLE_TARGET};
pub use builtins::json::JsonMode;
pub use error::{EvalError, EvalResult, SyntaxError};
pub use interpreter::{
    enumerable_entries, Interpreter, Limits, DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH,
};
pub use realm::Realm;
pub use script::{Script, DEFAULT_SCRIPT_NAME};
pub use stack::{MAX_NESTING_DEPTH, STACK_OVERFLOW_MESSAGE};
pub use value::{Callable, NativeFn, Object, ObjectKind, ObjectRef, Value};
