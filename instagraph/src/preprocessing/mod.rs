//! Image preparation ahead of OCR.
//!
//! Two independent stages, each producing a new [`RasterImage`]:
//! - [`scaler`]: bounded, aspect-preserving resize
//! - [`threshold`]: adaptive local-threshold binarization
//!
//! Both stages report failures instead of substituting their own output;
//! deciding what to fall back to is the pipeline's job.

pub mod scaler;
pub mod threshold;

pub use scaler::{scaled_dimensions, ImageScaler, ResampleScaler};
pub use threshold::{AdaptiveThreshold, ThresholdFilter};

use crate::error::Result;
use crate::raster::RasterImage;

/// Scale with the default bilinear resampler.
pub fn scale(image: &RasterImage, max_dimension: u32) -> Result<RasterImage> {
    ResampleScaler::default().scale(image, max_dimension)
}

/// Binarize with the adaptive threshold filter.
pub fn preprocess(image: &RasterImage, blur_radius_pixels: f32) -> Result<RasterImage> {
    AdaptiveThreshold.apply(image, blur_radius_pixels)
}
