//! OCR (Optical Character Recognition) Module
//!
//! Turns a prepared [`RasterImage`](crate::raster::RasterImage) into a
//! [`RecognitionResult`].
//!
//! # Architecture
//!
//! The module follows a factory/engine split:
//! - `EngineFactory` builds an `OcrEngine` for a language code
//! - `TesseractFactory` implements it through leptess (feature `tesseract`)
//! - `Recognizer` caches one engine per language, applies the accuracy and
//!   segmentation modes from `PipelineConfig`, and maps the raw output
//!
//! # Usage
//!
//! ```rust,ignore
//! let recognizer = Recognizer::tesseract(None);
//! let result = recognizer.recognize(&image, &PipelineConfig::photo())?;
//! println!("{result}");
//! ```

mod engine;
mod modes;
mod recognizer;
mod result;
mod tesseract;

pub use engine::{validate_language_code, EngineFactory, OcrEngine};
pub use modes::{AccuracyMode, SegmentationMode};
pub use recognizer::Recognizer;
pub use result::{RecognitionResult, NO_TEXT_MESSAGE};
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;
pub use tesseract::TesseractFactory;
