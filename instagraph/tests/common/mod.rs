// Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

use image::{DynamicImage, GrayImage, Luma};
use instagraph::ocr::{validate_language_code, EngineFactory, OcrEngine};
use instagraph::{AccuracyMode, InstagraphError, RasterImage, Result, SegmentationMode};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Solid grey image of the given size.
pub fn solid(width: u32, height: u32) -> RasterImage {
    RasterImage::new(DynamicImage::ImageLuma8(GrayImage::from_pixel(
        width,
        height,
        Luma([180]),
    )))
    .expect("non-empty test image")
}

/// Light page with dark horizontal "text lines" every 10 rows.
pub fn page(width: u32, height: u32) -> RasterImage {
    let gray = GrayImage::from_fn(width, height, |x, y| {
        if y % 10 < 2 && x % 7 != 0 {
            Luma([25])
        } else {
            Luma([215])
        }
    });
    RasterImage::new(DynamicImage::ImageLuma8(gray)).expect("non-empty test image")
}

/// Counters shared between a [`StubFactory`] and its engines.
#[derive(Default)]
pub struct EngineStats {
    pub created: AtomicUsize,
    pub recognized: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub last_size: std::sync::Mutex<Option<(u32, u32)>>,
}

/// Engine factory returning canned output.
///
/// Languages are checked with the same rules as the Tesseract backend.
pub struct StubFactory {
    output: Option<String>,
    delay: Duration,
    pub stats: Arc<EngineStats>,
}

impl StubFactory {
    pub fn returning(output: Option<&str>) -> Self {
        Self {
            output: output.map(String::from),
            delay: Duration::ZERO,
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl EngineFactory for StubFactory {
    fn create(&self, language: &str, _accuracy: AccuracyMode) -> Result<Box<dyn OcrEngine>> {
        validate_language_code(language)?;
        if language != "eng" {
            return Err(InstagraphError::EngineUnavailable(format!(
                "no traineddata for {language}"
            )));
        }
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubEngine {
            output: self.output.clone(),
            delay: self.delay,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct StubEngine {
    output: Option<String>,
    delay: Duration,
    stats: Arc<EngineStats>,
}

impl OcrEngine for StubEngine {
    fn set_segmentation_mode(&mut self, _mode: SegmentationMode) -> Result<()> {
        Ok(())
    }

    fn recognize(&mut self, image: &RasterImage) -> Result<Option<String>> {
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if let Ok(mut last) = self.stats.last_size.lock() {
            *last = Some(image.dimensions());
        }

        self.stats.recognized.fetch_add(1, Ordering::SeqCst);
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}
