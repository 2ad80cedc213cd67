use std::fmt;

use serde::Serialize;

/// Placeholder shown when recognition produced nothing.
pub const NO_TEXT_MESSAGE: &str = "No text recognized.";

/// Outcome of a single recognition attempt.
///
/// An empty or absent engine output is the explicit `NoText` value, never an
/// error and never an empty `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum RecognitionResult {
    Text(String),
    NoText,
}

impl RecognitionResult {
    /// Map raw engine output. Surrounding whitespace is trimmed, and
    /// `None`, empty and whitespace-only output all become `NoText`.
    pub fn from_engine_output(output: Option<String>) -> Self {
        match output {
            Some(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    RecognitionResult::NoText
                } else {
                    RecognitionResult::Text(trimmed.to_string())
                }
            }
            None => RecognitionResult::NoText,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RecognitionResult::Text(text) => Some(text),
            RecognitionResult::NoText => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RecognitionResult::NoText)
    }

    pub fn word_count(&self) -> usize {
        self.as_text()
            .map(|text| text.split_whitespace().count())
            .unwrap_or(0)
    }
}

impl fmt::Display for RecognitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionResult::Text(text) => f.write_str(text),
            RecognitionResult::NoText => f.write_str(NO_TEXT_MESSAGE),
        }
    }
}
