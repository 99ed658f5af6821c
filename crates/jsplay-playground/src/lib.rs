//! jsplay playground engine.
//!
//! Holds the editor's source text and the output of the last run. Each
//! [`Engine::run`] compiles the source into an isolated script, captures
//! `console.log` for exactly the duration of the run and reports failures
//! as an `Error: <message>` line instead of propagating them.
//!
//! ```
//! use jsplay_playground::Engine;
//!
//! let mut engine = Engine::new();
//! engine.set_source(r#"console.log(1, "a", {x: 1});"#).unwrap();
//! let result = engine.run();
//! assert!(result.success);
//! assert_eq!(result.output, "1 a {\"x\":1}\n");
//! ```

mod capture;
mod config;
mod engine;
mod output;
mod source;

pub use capture::ConsoleCapture;
pub use config::{ConfigError, PlaygroundConfig, DEFAULT_INITIAL_SOURCE, DEFAULT_PLACEHOLDER};
pub use engine::{
    fingerprint, thrown_message, Engine, EngineState, ExecutionResult, RunError, RunErrorKind,
};
pub use output::{render_error, OutputLog};
pub use source::{utf16_len, SourceError, SourceText, MAX_SOURCE_CHARS};
