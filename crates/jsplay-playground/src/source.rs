//! Editor source text, bounded the way a browser text field's `maxLength` is.

use serde::Serialize;
use thiserror::Error;

/// Default bound on the source text, in UTF-16 code units.
pub const MAX_SOURCE_CHARS: usize = 1500;

/// Source text rejected at the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source is {len} characters long; the limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// Length of `text` as a browser counts it: UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Source text no longer than its bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceText {
    text: String,
    max_chars: usize,
}

impl SourceText {
    /// Accept `text` if it fits in `max_chars`; never truncates.
    pub fn new(text: impl Into<String>, max_chars: usize) -> Result<Self, SourceError> {
        let text = text.into();
        let len = utf16_len(&text);
        if len > max_chars {
            return Err(SourceError::TooLong {
                len,
                max: max_chars,
            });
        }
        Ok(Self { text, max_chars })
    }

    pub fn empty(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            max_chars,
        }
    }

    /// Keep the longest prefix of `text` that fits, as a text field with
    /// `maxLength` does on paste. A character that would straddle the bound
    /// is dropped whole.
    pub fn truncated(text: &str, max_chars: usize) -> Self {
        let mut used = 0;
        let mut end = 0;
        for (idx, c) in text.char_indices() {
            used += c.len_utf16();
            if used > max_chars {
                break;
            }
            end = idx + c.len_utf8();
        }
        Self {
            text: text[..end].to_string(),
            max_chars,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in UTF-16 code units.
    pub fn char_count(&self) -> usize {
        utf16_len(&self.text)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_utf16_units() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        assert_eq!(utf16_len("😀"), 2);
    }

    #[test]
    fn test_rejects_overlong_text() {
        let err = SourceText::new("abcd", 3).unwrap_err();
        assert_eq!(err, SourceError::TooLong { len: 4, max: 3 });
        assert!(SourceText::new("abc", 3).is_ok());
    }

    #[test]
    fn test_truncates_on_character_boundaries() {
        assert_eq!(SourceText::truncated("abcdef", 4).as_str(), "abcd");
        assert_eq!(SourceText::truncated("a😀b", 2).as_str(), "a");
        assert_eq!(SourceText::truncated("a😀b", 3).as_str(), "a😀");
        assert_eq!(SourceText::truncated("short", 100).as_str(), "short");
    }
}
