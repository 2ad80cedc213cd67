//! Scale → threshold → recognize.
//!
//! [`Pipeline`] is the only place that applies fallback policy: a scaling
//! failure continues with the original image, a threshold failure continues
//! with the scaled image. Both are logged and recorded in
//! [`PipelineOutput::fallbacks`]. An unavailable OCR engine fails the run.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{validate_bound, PipelineConfig};
use crate::error::{InstagraphError, Result};
use crate::ocr::{RecognitionResult, Recognizer};
use crate::preprocessing::{AdaptiveThreshold, ImageScaler, ResampleScaler, ThresholdFilter};
use crate::raster::RasterImage;

/// A fallback branch taken during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Fallback {
    /// Scaling failed; the original image was thresholded instead.
    Scale { reason: String },
    /// Thresholding failed; the scaled image was recognized instead.
    Filter { reason: String },
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The exact image handed to the OCR engine.
    pub display_image: RasterImage,
    pub result: RecognitionResult,
    pub fallbacks: Vec<Fallback>,
}

pub struct Pipeline {
    scaler: Box<dyn ImageScaler>,
    filter: Box<dyn ThresholdFilter>,
    recognizer: Recognizer,
}

impl Pipeline {
    /// Pipeline with the bilinear scaler and the adaptive threshold filter.
    pub fn new(recognizer: Recognizer) -> Self {
        Self {
            scaler: Box::new(ResampleScaler::default()),
            filter: Box::new(AdaptiveThreshold),
            recognizer,
        }
    }

    pub fn tesseract(data_path: Option<String>) -> Self {
        Self::new(Recognizer::tesseract(data_path))
    }

    pub fn with_scaler(mut self, scaler: impl ImageScaler + 'static) -> Self {
        self.scaler = Box::new(scaler);
        self
    }

    pub fn with_filter(mut self, filter: impl ThresholdFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    /// Run all three stages on the calling thread.
    ///
    /// Recognition blocks; call this from a worker thread, or use
    /// [`Pipeline::run_blocking_task`] from async code.
    pub fn run(
        &self,
        image: RasterImage,
        max_dimension: u32,
        config: &PipelineConfig,
    ) -> Result<PipelineOutput> {
        self.execute(image, max_dimension, config, None)
    }

    /// Like [`Pipeline::run`], stopping with [`InstagraphError::Cancelled`]
    /// at the next stage boundary once `cancel` fires.
    pub fn run_with_cancel(
        &self,
        image: RasterImage,
        max_dimension: u32,
        config: &PipelineConfig,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput> {
        self.execute(image, max_dimension, config, Some(cancel))
    }

    /// Run on a dedicated worker thread, bounded by `timeout`.
    ///
    /// Returns as soon as the deadline passes or `cancel` fires; either one
    /// cancels the run's token so the worker stops at its next stage
    /// boundary. The worker is detached, so a recognition still running
    /// inside the engine never holds up runtime shutdown.
    pub async fn run_blocking_task(
        self: Arc<Self>,
        image: RasterImage,
        max_dimension: u32,
        config: PipelineConfig,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<PipelineOutput> {
        let run_token = cancel.child_token();
        let worker_token = run_token.clone();
        let (tx, rx) = oneshot::channel();

        thread::Builder::new()
            .name("instagraph-run".to_string())
            .spawn(move || {
                let output = self.run_with_cancel(image, max_dimension, &config, &worker_token);
                // The receiver is gone once the caller timed out or was cancelled.
                let _ = tx.send(output);
            })?;

        tokio::select! {
            outcome = tokio::time::timeout(timeout, rx) => match outcome {
                Ok(Ok(output)) => output,
                Ok(Err(_)) => Err(InstagraphError::Internal(
                    "Pipeline worker stopped without a result".to_string(),
                )),
                Err(_) => {
                    run_token.cancel();
                    warn!("Pipeline run exceeded {:?}, abandoning it", timeout);
                    Err(InstagraphError::Timeout(timeout))
                }
            },
            _ = cancel.cancelled() => {
                run_token.cancel();
                Err(InstagraphError::Cancelled)
            }
        }
    }

    fn execute(
        &self,
        image: RasterImage,
        max_dimension: u32,
        config: &PipelineConfig,
        cancel: Option<&CancellationToken>,
    ) -> Result<PipelineOutput> {
        validate_bound(max_dimension)?;
        config.validate()?;

        let start = Instant::now();
        let (original_width, original_height) = image.dimensions();
        let mut fallbacks = Vec::new();

        check_cancelled(cancel)?;
        let scaled = match self.scaler.scale(&image, max_dimension) {
            Ok(scaled) => scaled,
            Err(e) if e.is_recoverable() => {
                warn!("Scaling failed, continuing with original image: {}", e);
                fallbacks.push(Fallback::Scale {
                    reason: e.to_string(),
                });
                image
            }
            Err(e) => return Err(e),
        };

        check_cancelled(cancel)?;
        let preprocessed = match self.filter.apply(&scaled, config.blur_radius_pixels) {
            Ok(filtered) => filtered,
            Err(e) if e.is_recoverable() => {
                warn!("Thresholding failed, continuing with scaled image: {}", e);
                fallbacks.push(Fallback::Filter {
                    reason: e.to_string(),
                });
                scaled
            }
            Err(e) => return Err(e),
        };

        check_cancelled(cancel)?;
        let result = self.recognizer.recognize(&preprocessed, config)?;

        info!(
            "Pipeline finished in {:?}: {}x{} -> {}x{}, {} words, {} fallback(s)",
            start.elapsed(),
            original_width,
            original_height,
            preprocessed.width(),
            preprocessed.height(),
            result.word_count(),
            fallbacks.len()
        );

        Ok(PipelineOutput {
            display_image: preprocessed,
            result,
            fallbacks,
        })
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(InstagraphError::Cancelled),
        _ => Ok(()),
    }
}
