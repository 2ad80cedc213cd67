//! Instagraph - photo-to-text utility
//!
//! Prepares a photo for OCR and recognizes its text in three stages:
//! 1. scale so the larger side matches a bound, keeping the aspect ratio
//! 2. binarize with an adaptive local threshold
//! 3. recognize with Tesseract
//!
//! ```rust,ignore
//! use instagraph::{Pipeline, PipelineConfig, RasterImage};
//!
//! let pipeline = Pipeline::tesseract(None);
//! let image = RasterImage::open("receipt.jpg")?;
//! let output = pipeline.run(image, 1000, &PipelineConfig::photo())?;
//! println!("{}", output.result);
//! ```

pub mod config;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod preprocessing;
pub mod raster;

pub use config::{Config, PipelineConfig};
pub use error::{InstagraphError, Result};
pub use ocr::{AccuracyMode, RecognitionResult, Recognizer, SegmentationMode};
pub use pipeline::{Fallback, Pipeline, PipelineOutput};
pub use raster::RasterImage;
