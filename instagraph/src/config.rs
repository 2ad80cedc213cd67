use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{InstagraphError, Result};
use crate::ocr::{AccuracyMode, SegmentationMode};

/// Default bound for the larger image side before thresholding.
pub const DEFAULT_MAX_DIMENSION: u32 = 1000;

/// Blur radius the adaptive threshold uses when nothing else is configured.
pub const DEFAULT_BLUR_RADIUS: f32 = 4.0;

/// Blur radius tuned for photographed text; wide enough to even out uneven lighting.
pub const PHOTO_BLUR_RADIUS: f32 = 15.0;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|val| !val.trim().is_empty())
}

/// Options handed to every stage of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tesseract language string, e.g. `eng` or `eng+deu`.
    pub language_code: String,
    pub accuracy_mode: AccuracyMode,
    pub segmentation_mode: SegmentationMode,
    pub blur_radius_pixels: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language_code: "eng".to_string(),
            accuracy_mode: AccuracyMode::default(),
            segmentation_mode: SegmentationMode::default(),
            blur_radius_pixels: DEFAULT_BLUR_RADIUS,
        }
    }
}

impl PipelineConfig {
    /// Settings for photographed documents: English, combined passes,
    /// automatic segmentation and a wide threshold neighbourhood.
    pub fn photo() -> Self {
        Self {
            blur_radius_pixels: PHOTO_BLUR_RADIUS,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.blur_radius_pixels.is_finite() || self.blur_radius_pixels <= 0.0 {
            return Err(InstagraphError::Validation(format!(
                "blur_radius_pixels must be a positive number, got {}",
                self.blur_radius_pixels
            )));
        }
        Ok(())
    }
}

pub fn validate_bound(max_dimension: u32) -> Result<()> {
    if max_dimension == 0 {
        return Err(InstagraphError::Validation(
            "max_dimension must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub max_dimension: u32,
    pub timeout_secs: u64,
    /// Directory holding `*.traineddata`; `None` uses Tesseract's own lookup.
    pub tessdata_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let photo = PipelineConfig::photo();

        Self {
            pipeline: PipelineConfig {
                language_code: env_non_empty("OCR_LANGUAGES").unwrap_or(photo.language_code),
                accuracy_mode: parse_env_or("OCR_ACCURACY_MODE", photo.accuracy_mode),
                segmentation_mode: parse_env_or("OCR_SEGMENTATION_MODE", photo.segmentation_mode),
                blur_radius_pixels: parse_env_or("OCR_BLUR_RADIUS", photo.blur_radius_pixels),
            },
            max_dimension: parse_env_or("OCR_MAX_DIMENSION", DEFAULT_MAX_DIMENSION),
            timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
            tessdata_path: env_non_empty("OCR_TESSDATA_PATH"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        validate_bound(self.max_dimension)?;
        if self.timeout_secs == 0 {
            return Err(InstagraphError::Validation(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.pipeline.validate()
    }
}
