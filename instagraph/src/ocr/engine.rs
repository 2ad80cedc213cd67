use std::sync::OnceLock;

use regex::Regex;

use crate::error::{InstagraphError, Result};
use crate::raster::RasterImage;

use super::modes::{AccuracyMode, SegmentationMode};

/// A constructed OCR engine bound to one language and accuracy mode.
///
/// Instances are not assumed to be safe for concurrent use; callers hold
/// exclusive access for the whole configure-then-recognize sequence.
pub trait OcrEngine: Send {
    fn set_segmentation_mode(&mut self, mode: SegmentationMode) -> Result<()>;

    /// Blocking recognition. `Ok(None)` means the engine produced no text.
    fn recognize(&mut self, image: &RasterImage) -> Result<Option<String>>;
}

/// Builds engines for a language code.
///
/// The accuracy mode picks which recognizers get loaded, so it is fixed when
/// the engine is built. A language or mode whose model cannot be loaded fails
/// with [`InstagraphError::EngineUnavailable`].
pub trait EngineFactory: Send + Sync {
    fn create(&self, language: &str, accuracy: AccuracyMode) -> Result<Box<dyn OcrEngine>>;
}

fn language_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+(\+[A-Za-z0-9_]+)*$").ok())
        .as_ref()
        .ok_or_else(|| InstagraphError::Internal("Invalid language code pattern".to_string()))
}

/// Check a Tesseract-style language string such as `eng` or `eng+deu`.
pub fn validate_language_code(language: &str) -> Result<()> {
    if language.is_empty() {
        return Err(InstagraphError::EngineUnavailable(
            "No OCR language configured".to_string(),
        ));
    }

    if !language_pattern()?.is_match(language) {
        return Err(InstagraphError::EngineUnavailable(format!(
            "Unsupported OCR language code '{language}'"
        )));
    }

    Ok(())
}
