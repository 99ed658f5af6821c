//! jsplay playground as a WASM module for browser environments.
//!
//! This crate wraps the playground engine in a `wasm-bindgen` class that a
//! page binds to its editor, output pane and "Run" button.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { PlaygroundHandle } from 'jsplay-wasm';
//!
//! await init();
//!
//! const playground = new PlaygroundHandle();
//! editor.value = playground.source();
//! editor.maxLength = playground.maxChars();
//!
//! runButton.onclick = () => {
//!   playground.setSource(editor.value);
//!   const result = JSON.parse(playground.run());
//!   output.textContent = playground.outputText();
//!   // { success: false, lines: ["a"], error: { kind: "user_code_throw", message: "x" }, ... }
//! };
//! ```

use jsplay_playground::{Engine, PlaygroundConfig, SourceText};
use wasm_bindgen::prelude::*;

/// One playground instance: source, last output and its own global realm.
#[wasm_bindgen]
pub struct PlaygroundHandle {
    engine: Engine,
}

#[wasm_bindgen]
impl PlaygroundHandle {
    /// A playground with the default config.
    #[wasm_bindgen(constructor)]
    pub fn new() -> PlaygroundHandle {
        PlaygroundHandle {
            engine: Engine::new(),
        }
    }

    /// A playground configured from a JSON object such as
    /// `{"step_limit": 100000}`. Throws on an invalid config.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<PlaygroundHandle, JsError> {
        let config = PlaygroundConfig::from_json(config_json)?;
        let engine = Engine::with_config(config)?;
        Ok(PlaygroundHandle { engine })
    }

    /// Replace the source. Text over the bound is cut the way a text
    /// field's `maxLength` cuts a paste; returns the text that was kept.
    #[wasm_bindgen(js_name = setSource)]
    pub fn set_source(&mut self, text: &str) -> String {
        let max = self.engine.config().max_source_chars;
        let kept = SourceText::truncated(text, max);
        // `kept` fits the engine's bound, so it is never rejected.
        let _ = self.engine.set_source(kept.as_str());
        kept.as_str().to_string()
    }

    pub fn source(&self) -> String {
        self.engine.source().as_str().to_string()
    }

    /// Source length in UTF-16 code units, as `textarea.value.length` counts.
    #[wasm_bindgen(js_name = charCount)]
    pub fn char_count(&self) -> usize {
        self.engine.source().char_count()
    }

    #[wasm_bindgen(js_name = maxChars)]
    pub fn max_chars(&self) -> usize {
        self.engine.config().max_source_chars
    }

    /// Run the current source. Returns a JSON `ExecutionResult`:
    /// ```json
    /// {
    ///   "success": false,
    ///   "lines": ["a"],
    ///   "error": { "kind": "user_code_throw", "message": "x" },
    ///   "output": "a\nError: x\n",
    ///   "source_sha256": "…"
    /// }
    /// ```
    pub fn run(&mut self) -> String {
        let result = self.engine.run();
        serde_json::to_string(&result).unwrap_or_else(|e| {
            serde_json::json!({
                "success": false,
                "lines": [],
                "error": { "kind": "user_code_throw", "message": format!("Serialization error: {e}") },
                "output": "",
                "source_sha256": "",
            })
            .to_string()
        })
    }

    /// Text for the output pane: the last output, or the placeholder.
    #[wasm_bindgen(js_name = outputText)]
    pub fn output_text(&self) -> String {
        self.engine.display_text().to_string()
    }

    /// Whether the source changed since the output was produced.
    #[wasm_bindgen(js_name = isOutputStale)]
    pub fn is_output_stale(&self) -> bool {
        self.engine.is_output_stale()
    }
}

impl Default for PlaygroundHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Return the playground version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
