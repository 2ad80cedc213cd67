use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{InstagraphError, Result};
use crate::raster::RasterImage;

use super::engine::{EngineFactory, OcrEngine};
use super::modes::AccuracyMode;
use super::result::RecognitionResult;
use super::tesseract::TesseractFactory;

type SharedEngine = Arc<Mutex<Box<dyn OcrEngine>>>;
type EngineKey = (String, AccuracyMode);

/// Adapter between the pipeline and an external OCR engine.
///
/// Engines are built lazily, one per language and accuracy mode, and reused.
/// Each engine is used by one call at a time: setting the segmentation mode,
/// recognizing and reading the text happen under its lock. Engines are built
/// outside the cache lock, so a slow model load never blocks languages that
/// are already loaded. A language that fails to load is not cached, so the
/// next call tries again.
pub struct Recognizer {
    factory: Arc<dyn EngineFactory>,
    engines: Mutex<HashMap<EngineKey, SharedEngine>>,
}

impl Recognizer {
    pub fn new(factory: impl EngineFactory + 'static) -> Self {
        Self::with_factory(Arc::new(factory))
    }

    pub fn with_factory(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// Recognizer backed by Tesseract.
    pub fn tesseract(data_path: Option<String>) -> Self {
        Self::new(TesseractFactory::new(data_path))
    }

    /// Run one recognition attempt. Blocks for the duration of the OCR pass.
    pub fn recognize(
        &self,
        image: &RasterImage,
        config: &PipelineConfig,
    ) -> Result<RecognitionResult> {
        let engine = self.engine_for(&config.language_code, config.accuracy_mode)?;
        let mut engine = engine.lock().map_err(|_| {
            InstagraphError::Internal(format!(
                "OCR engine for '{}' is poisoned",
                config.language_code
            ))
        })?;

        engine.set_segmentation_mode(config.segmentation_mode)?;

        let start = Instant::now();
        let output = engine.recognize(image)?;
        let result = RecognitionResult::from_engine_output(output);

        debug!(
            "Recognized {}x{} image ({}, {}) in {:?}: {} words",
            image.width(),
            image.height(),
            config.accuracy_mode,
            config.segmentation_mode,
            start.elapsed(),
            result.word_count()
        );

        Ok(result)
    }

    /// Languages with at least one engine already built.
    pub fn loaded_languages(&self) -> Vec<String> {
        match self.engines.lock() {
            Ok(engines) => {
                let mut languages: Vec<String> =
                    engines.keys().map(|(language, _)| language.clone()).collect();
                languages.sort();
                languages.dedup();
                languages
            }
            Err(_) => Vec::new(),
        }
    }

    fn engine_for(&self, language: &str, accuracy: AccuracyMode) -> Result<SharedEngine> {
        let key = (language.to_string(), accuracy);

        if let Some(engine) = self.cache()?.get(&key) {
            return Ok(Arc::clone(engine));
        }

        let engine: SharedEngine = Arc::new(Mutex::new(self.factory.create(language, accuracy)?));

        // A concurrent call may have loaded the same engine meanwhile; keep the first.
        let mut engines = self.cache()?;
        let engine = Arc::clone(engines.entry(key).or_insert_with(|| {
            info!(language = %language, accuracy = %accuracy, "OCR engine ready");
            engine
        }));
        Ok(engine)
    }

    fn cache(&self) -> Result<MutexGuard<'_, HashMap<EngineKey, SharedEngine>>> {
        self.engines
            .lock()
            .map_err(|_| InstagraphError::Internal("OCR engine cache is poisoned".to_string()))
    }
}
