use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use crate::error::{InstagraphError, Result};

/// An in-memory bitmap flowing through the pipeline.
///
/// Always has a non-zero width and height. Stages never mutate a
/// `RasterImage`; each one hands back a freshly allocated image.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    inner: DynamicImage,
}

impl RasterImage {
    pub fn new(image: DynamicImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(InstagraphError::InvalidImage(format!(
                "Image has zero area: {width}x{height}"
            )));
        }
        Ok(Self { inner: image })
    }

    /// Decode an encoded image (PNG, JPEG, ...) from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(InstagraphError::InvalidImage("Empty image data".to_string()));
        }

        let img = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()
            .map_err(|e| InstagraphError::InvalidImage(format!("Failed to decode image: {e}")))?;

        Self::new(img)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| {
                InstagraphError::InvalidImage(format!("Failed to decode {}: {e}", path.display()))
            })?;

        Self::new(img)
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width() as f64 / self.height() as f64
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.inner
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.inner
    }

    /// Encode as PNG, the format handed to the OCR engine.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.inner
            .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(output)
    }

    /// Write to disk; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.save(path)?;
        Ok(())
    }
}
