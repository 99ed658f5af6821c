//! The playground engine: holds the source and the last output, runs the
//! source on demand and turns every failure into output text.

use jsplay_eval::{EvalError, ObjectKind, ObjectRef, Realm, Script, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::capture::ConsoleCapture;
use crate::config::{ConfigError, PlaygroundConfig};
use crate::output::OutputLog;
use crate::source::{SourceError, SourceText};

// ══════════════════════════════════════════════════════════════════════════════
// Results
// ══════════════════════════════════════════════════════════════════════════════

/// `Running` only exists inside [`Engine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Running,
}

/// Why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorKind {
    /// An exception thrown by the script or raised by the interpreter.
    UserCodeThrow,
    /// The source did not parse.
    SyntaxError,
    /// A captured `console.log` argument could not be serialized.
    SerializationFailure,
    /// The configured step budget ran out.
    StepLimitExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: RunErrorKind,
    pub message: String,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Captured `console.log` lines, one per call, in call order.
    pub lines: Vec<String>,
    /// Set when `success` is false.
    pub error: Option<RunError>,
    /// The full output text, including the trailing error line of a failure.
    pub output: String,
    /// Hex SHA-256 of the source that was run.
    pub source_sha256: String,
}

/// Hex SHA-256 of `source`.
pub fn fingerprint(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ══════════════════════════════════════════════════════════════════════════════
// Engine
// ══════════════════════════════════════════════════════════════════════════════

/// Runs user code against its own realm and keeps the output of the last run.
///
/// `run` takes `&mut self`, so runs never overlap.
pub struct Engine {
    config: PlaygroundConfig,
    realm: Realm,
    source: SourceText,
    output: OutputLog,
    state: EngineState,
    last_result: Option<ExecutionResult>,
}

impl Engine {
    /// An engine with the default config, holding the default initial source.
    pub fn new() -> Self {
        let config = PlaygroundConfig::default();
        let source = SourceText::truncated(&config.initial_source, config.max_source_chars);
        Self::assemble(config, Realm::new(), source)
    }

    pub fn with_config(config: PlaygroundConfig) -> Result<Self, ConfigError> {
        Self::with_realm(config, Realm::new())
    }

    /// Run against a host-provided realm, e.g. one with extra globals or a
    /// different console sink.
    pub fn with_realm(config: PlaygroundConfig, realm: Realm) -> Result<Self, ConfigError> {
        config.validate()?;
        let source = SourceText::new(config.initial_source.as_str(), config.max_source_chars)?;
        Ok(Self::assemble(config, realm, source))
    }

    fn assemble(config: PlaygroundConfig, realm: Realm, source: SourceText) -> Self {
        Self {
            config,
            realm,
            source,
            output: OutputLog::new(),
            state: EngineState::Idle,
            last_result: None,
        }
    }

    /// Replace the source text. Text over the bound is rejected, not cut.
    pub fn set_source(&mut self, text: &str) -> Result<(), SourceError> {
        self.source = SourceText::new(text, self.config.max_source_chars)?;
        Ok(())
    }

    pub fn source(&self) -> &SourceText {
        &self.source
    }

    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    /// What the output pane shows: the last output, or the placeholder when
    /// there is none.
    pub fn display_text(&self) -> &str {
        if self.output.is_empty() {
            &self.config.placeholder
        } else {
            self.output.as_str()
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }

    /// Whether the displayed output came from different source text than
    /// the editor holds now.
    pub fn is_output_stale(&self) -> bool {
        self.last_result
            .as_ref()
            .is_some_and(|result| result.source_sha256 != fingerprint(self.source.as_str()))
    }

    /// Run the current source once. Never fails: errors end up in the output.
    pub fn run(&mut self) -> ExecutionResult {
        self.state = EngineState::Running;
        self.output.clear();
        let source_sha256 = fingerprint(self.source.as_str());
        tracing::debug!(chars = self.source.char_count(), "run started");

        let (log, error) = {
            let capture = ConsoleCapture::install(&self.realm);
            let error = match Script::compile(self.source.as_str()) {
                Err(err) => Some(RunError {
                    kind: RunErrorKind::SyntaxError,
                    message: err.message,
                }),
                Ok(script) => match script.run(&self.realm, self.config.limits()) {
                    Ok(_) => None,
                    Err(err) => Some(classify(&capture, &err)),
                },
            };
            (capture.finish(), error)
        };

        let lines = log.lines().to_vec();
        self.output = log;
        if let Some(error) = &error {
            self.output.push_error(&error.message);
            tracing::warn!(kind = ?error.kind, message = %error.message, "run failed");
        }
        tracing::info!(
            success = error.is_none(),
            lines = lines.len(),
            "run finished"
        );

        let result = ExecutionResult {
            success: error.is_none(),
            lines,
            error,
            output: self.output.as_str().to_string(),
            source_sha256,
        };
        self.last_result = Some(result.clone());
        self.state = EngineState::Idle;
        result
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(capture: &ConsoleCapture<'_>, err: &EvalError) -> RunError {
    let kind = match err {
        EvalError::StepLimitExceeded { .. } => RunErrorKind::StepLimitExceeded,
        _ if capture.is_serialization_failure(err) => RunErrorKind::SerializationFailure,
        _ => RunErrorKind::UserCodeThrow,
    };
    let message = match err.thrown() {
        Some(value) => thrown_message(value),
        None => err.to_string(),
    };
    RunError { kind, message }
}

/// The `message` property of a thrown value; `undefined` when it has none.
pub fn thrown_message(value: &Value) -> String {
    let Value::Object(obj) = value else {
        return "undefined".to_string();
    };
    let message = match &obj.borrow().kind {
        ObjectKind::Error { message, .. } => Some(Value::String(message.clone())),
        _ => None,
    };
    let message = message.or_else(|| inherited_property(obj, "message"));
    match message {
        None => "undefined".to_string(),
        Some(Value::Object(_)) => "[object Object]".to_string(),
        Some(primitive) => primitive.primitive_to_string().unwrap_or_default(),
    }
}

fn inherited_property(obj: &ObjectRef, key: &str) -> Option<Value> {
    let mut current = Some(obj.clone());
    while let Some(link) = current {
        if let Some(value) = link.get_own(key) {
            return Some(value);
        }
        current = link.borrow().proto.clone();
    }
    None
}
