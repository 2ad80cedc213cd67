use image::{DynamicImage, GrayImage, Luma};
use imageproc::integral_image::{integral_image, sum_image_pixels};
use tracing::debug;

use crate::error::{InstagraphError, Result};
use crate::raster::RasterImage;

/// Binarizes an image for OCR without changing its size.
pub trait ThresholdFilter: Send + Sync {
    fn apply(&self, image: &RasterImage, blur_radius_pixels: f32) -> Result<RasterImage>;
}

/// Adaptive local threshold.
///
/// Each pixel's luminance is compared with the mean luminance of the square
/// neighbourhood around it (radius taken from the blur radius, rounded to
/// whole pixels). Darker pixels become black, the rest white. The result is a
/// single-channel two-tone image with the input's dimensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveThreshold;

impl AdaptiveThreshold {
    pub fn new() -> Self {
        Self
    }
}

/// Neighbourhood radius for a blur radius, at least one pixel.
///
/// Radii beyond the larger image side cover the whole image already and are
/// clamped to it.
pub(crate) fn block_radius(blur_radius_pixels: f32, width: u32, height: u32) -> Result<u32> {
    if !blur_radius_pixels.is_finite() || blur_radius_pixels <= 0.0 {
        return Err(InstagraphError::FilterFailure(format!(
            "Blur radius must be a positive number, got {blur_radius_pixels}"
        )));
    }
    Ok((blur_radius_pixels.round() as u32).clamp(1, width.max(height).max(1)))
}

/// Local-mean threshold over a `u64` integral image.
///
/// A pixel at least as bright as the integer mean of its clipped
/// `(2 * radius + 1)` square neighbourhood turns white, anything darker black.
/// Sums are 64-bit so photos of any size are safe.
fn local_mean_threshold(luma: &GrayImage, radius: u32) -> GrayImage {
    let (width, height) = luma.dimensions();
    let integral = integral_image::<_, u64>(luma);

    GrayImage::from_fn(width, height, |x, y| {
        let left = x.saturating_sub(radius);
        let top = y.saturating_sub(radius);
        let right = x.saturating_add(radius).min(width - 1);
        let bottom = y.saturating_add(radius).min(height - 1);

        let count = u64::from(right - left + 1) * u64::from(bottom - top + 1);
        let mean = sum_image_pixels(&integral, left, top, right, bottom)[0] / count;

        if u64::from(luma.get_pixel(x, y)[0]) >= mean {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

impl ThresholdFilter for AdaptiveThreshold {
    fn apply(&self, image: &RasterImage, blur_radius_pixels: f32) -> Result<RasterImage> {
        let (width, height) = image.dimensions();
        let radius = block_radius(blur_radius_pixels, width, height)?;

        let luma = image.as_dynamic().to_luma8();
        let binary = local_mean_threshold(&luma, radius);

        debug!(
            "Adaptive threshold applied to {}x{} (block radius {})",
            binary.width(),
            binary.height(),
            radius
        );

        RasterImage::new(DynamicImage::ImageLuma8(binary))
            .map_err(|e| InstagraphError::FilterFailure(e.to_string()))
    }
}
