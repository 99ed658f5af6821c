//! The output log shown under the editor.

/// Append-only text accumulated during one run.
///
/// Every entry is terminated by `\n` in the text. An entry may itself span
/// several lines, as `console.log("a\nb")` does; it is still one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLog {
    text: String,
    entries: Vec<String>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry and its terminator.
    pub fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
        self.entries.push(line.to_string());
    }

    /// Append the trailing `Error: <message>` line of a failed run.
    pub fn push_error(&mut self, message: &str) {
        self.push_line(&render_error(message));
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.entries.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of entries pushed, not of `\n`-separated lines.
    pub fn line_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Entries in push order, without their terminators.
    pub fn lines(&self) -> &[String] {
        &self.entries
    }
}

/// `Error: <message>`, the form failures take in the output.
pub fn render_error(message: &str) -> String {
    format!("Error: {message}")
}
