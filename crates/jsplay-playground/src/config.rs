//! Playground configuration.

use jsplay_eval::{Limits, DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::{SourceError, SourceText, MAX_SOURCE_CHARS};

/// Text shown in the output pane when there is nothing to show.
pub const DEFAULT_PLACEHOLDER: &str = "Output will be displayed here.";

/// Editor content before the user types anything.
pub const DEFAULT_INITIAL_SOURCE: &str =
    "// Write your JavaScript code here\nconsole.log(\"Hello, World!\");";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid playground config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`{field}` must be greater than zero")]
    Zero { field: &'static str },
    #[error("`{field}` must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },
    #[error("initial source: {0}")]
    InitialSource(#[from] SourceError),
}

/// Engine settings. Every field is optional in JSON and falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Bound on the source text, in UTF-16 code units.
    pub max_source_chars: usize,
    /// Evaluation step budget per run; `None` lets a run loop forever.
    pub step_limit: Option<u64>,
    /// Nesting limit for script function calls, at most [`MAX_CALL_DEPTH`].
    pub max_call_depth: usize,
    pub placeholder: String,
    pub initial_source: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            max_source_chars: MAX_SOURCE_CHARS,
            step_limit: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            initial_source: DEFAULT_INITIAL_SOURCE.to_string(),
        }
    }
}

impl PlaygroundConfig {
    /// Parse and validate a JSON config object.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_source_chars == 0 {
            return Err(ConfigError::Zero {
                field: "max_source_chars",
            });
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::Zero {
                field: "max_call_depth",
            });
        }
        if self.max_call_depth > MAX_CALL_DEPTH {
            return Err(ConfigError::TooLarge {
                field: "max_call_depth",
                value: self.max_call_depth,
                max: MAX_CALL_DEPTH,
            });
        }
        if self.step_limit == Some(0) {
            return Err(ConfigError::Zero {
                field: "step_limit",
            });
        }
        SourceText::new(self.initial_source.as_str(), self.max_source_chars)?;
        Ok(())
    }

    /// Interpreter limits for one run.
    pub fn limits(&self) -> Limits {
        Limits {
            step_limit: self.step_limit,
            max_call_depth: self.max_call_depth,
        }
    }
}
