use image::imageops::FilterType;
use tracing::debug;

use crate::error::{InstagraphError, Result};
use crate::raster::RasterImage;

/// Largest canvas the resampler will allocate (16384 x 16384).
const MAX_OUTPUT_PIXELS: u64 = 16_384 * 16_384;

/// Resizes an image so its larger side equals a bound.
pub trait ImageScaler: Send + Sync {
    fn scale(&self, image: &RasterImage, max_dimension: u32) -> Result<RasterImage>;
}

/// Size of the scaled canvas for a `width` x `height` input.
///
/// The dominant axis becomes `max_dimension` and the other axis keeps the
/// input's aspect ratio, rounded to the nearest pixel (never below 1).
/// Square inputs map to a `max_dimension` square. Images smaller than the
/// bound are scaled up.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let bound = max_dimension as f64;

    if width > height {
        let scaled_height = (height as f64 / width as f64 * bound).round().max(1.0);
        (max_dimension, scaled_height as u32)
    } else {
        let scaled_width = (width as f64 / height as f64 * bound).round().max(1.0);
        (scaled_width as u32, max_dimension)
    }
}

/// Resampling scaler backed by `image::imageops`.
///
/// Uses bilinear (`Triangle`) filtering unless configured otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ResampleScaler {
    filter: FilterType,
}

impl Default for ResampleScaler {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl ResampleScaler {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }
}

impl ImageScaler for ResampleScaler {
    fn scale(&self, image: &RasterImage, max_dimension: u32) -> Result<RasterImage> {
        if max_dimension == 0 {
            return Err(InstagraphError::RenderFailure(
                "Dimension bound must be positive".to_string(),
            ));
        }

        let (width, height) = image.dimensions();
        let (target_width, target_height) = scaled_dimensions(width, height, max_dimension);

        let pixels = target_width as u64 * target_height as u64;
        if pixels > MAX_OUTPUT_PIXELS {
            return Err(InstagraphError::RenderFailure(format!(
                "Scaled canvas {target_width}x{target_height} exceeds {MAX_OUTPUT_PIXELS} pixels"
            )));
        }

        let resized = image
            .as_dynamic()
            .resize_exact(target_width, target_height, self.filter);

        debug!(
            "Scaled {}x{} -> {}x{} (bound {})",
            width, height, target_width, target_height, max_dimension
        );

        RasterImage::new(resized).map_err(|e| InstagraphError::RenderFailure(e.to_string()))
    }
}
