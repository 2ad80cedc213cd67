#[cfg(feature = "tesseract")]
use std::ffi::{CStr, CString};

#[cfg(feature = "tesseract")]
use leptess::capi::{
    TessOcrEngineMode, TessOcrEngineMode_OEM_LSTM_ONLY,
    TessOcrEngineMode_OEM_TESSERACT_LSTM_COMBINED, TessOcrEngineMode_OEM_TESSERACT_ONLY,
};
#[cfg(feature = "tesseract")]
use leptess::{leptonica, tesseract::TessApi, Variable};
#[cfg(feature = "tesseract")]
use tracing::{debug, info};

use crate::error::{InstagraphError, Result};
#[cfg(feature = "tesseract")]
use crate::raster::RasterImage;

use super::engine::{validate_language_code, EngineFactory, OcrEngine};
#[cfg(feature = "tesseract")]
use super::modes::SegmentationMode;
use super::modes::AccuracyMode;

/// Builds Tesseract engines through leptess.
///
/// `data_path` points at a `tessdata` directory; `None` lets Tesseract use
/// `TESSDATA_PREFIX` or its compiled-in default.
#[derive(Debug, Clone, Default)]
pub struct TesseractFactory {
    data_path: Option<String>,
}

impl TesseractFactory {
    pub fn new(data_path: Option<String>) -> Self {
        Self { data_path }
    }

    pub fn data_path(&self) -> Option<&str> {
        self.data_path.as_deref()
    }
}

impl EngineFactory for TesseractFactory {
    fn create(&self, language: &str, accuracy: AccuracyMode) -> Result<Box<dyn OcrEngine>> {
        validate_language_code(language)?;
        create_tesseract(self.data_path(), language, accuracy)
    }
}

#[cfg(feature = "tesseract")]
fn engine_mode(accuracy: AccuracyMode) -> TessOcrEngineMode {
    match accuracy {
        AccuracyMode::Fast => TessOcrEngineMode_OEM_TESSERACT_ONLY,
        AccuracyMode::Accurate => TessOcrEngineMode_OEM_LSTM_ONLY,
        AccuracyMode::Combined => TessOcrEngineMode_OEM_TESSERACT_LSTM_COMBINED,
    }
}

#[cfg(feature = "tesseract")]
fn create_tesseract(
    data_path: Option<&str>,
    language: &str,
    accuracy: AccuracyMode,
) -> Result<Box<dyn OcrEngine>> {
    let data_path_cstr = data_path
        .map(CString::new)
        .transpose()
        .map_err(|_| {
            InstagraphError::EngineUnavailable("Tessdata path contains a NUL byte".into())
        })?;
    let language_cstr = CString::new(language).map_err(|_| {
        InstagraphError::EngineUnavailable(format!("Invalid OCR language code '{language}'"))
    })?;

    let mut api = TessApi::new(data_path, language).map_err(|e| {
        InstagraphError::EngineUnavailable(format!(
            "Tesseract could not load language '{language}': {e}"
        ))
    })?;

    // The engine mode is only read by Init; re-running it on the same handle
    // reloads the language with the requested recognizers.
    api.raw
        .init_4(
            data_path_cstr.as_deref(),
            Some(language_cstr.as_c_str()),
            engine_mode(accuracy),
        )
        .map_err(|_| {
            InstagraphError::EngineUnavailable(format!(
                "Tesseract could not load language '{language}' in {accuracy} mode"
            ))
        })?;

    info!(language = %language, accuracy = %accuracy, "Tesseract OCR initialized");
    Ok(Box::new(TesseractEngine {
        api,
        language: language.to_string(),
        accuracy,
    }))
}

#[cfg(not(feature = "tesseract"))]
fn create_tesseract(
    _data_path: Option<&str>,
    language: &str,
    _accuracy: AccuracyMode,
) -> Result<Box<dyn OcrEngine>> {
    Err(InstagraphError::EngineUnavailable(format!(
        "cannot load '{language}': built without the `tesseract` feature"
    )))
}

#[cfg(feature = "tesseract")]
pub struct TesseractEngine {
    api: TessApi,
    language: String,
    accuracy: AccuracyMode,
}

#[cfg(feature = "tesseract")]
impl TesseractEngine {
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn accuracy_mode(&self) -> AccuracyMode {
        self.accuracy
    }
}

#[cfg(feature = "tesseract")]
impl OcrEngine for TesseractEngine {
    fn set_segmentation_mode(&mut self, mode: SegmentationMode) -> Result<()> {
        let value = CString::new(mode.code().to_string())
            .map_err(|e| InstagraphError::Internal(e.to_string()))?;
        self.api
            .raw
            .set_variable(Variable::TesseditPagesegMode.as_cstr(), &value)
            .map_err(|e| {
                InstagraphError::Recognition(format!(
                    "Failed to set page segmentation mode {mode}: {e}"
                ))
            })
    }

    fn recognize(&mut self, image: &RasterImage) -> Result<Option<String>> {
        // Leptonica decodes the image itself, so hand it an encoded PNG.
        let png = image.to_png_bytes()?;
        let pix = leptonica::pix_read_mem(&png)
            .map_err(|e| InstagraphError::Recognition(format!("Failed to set image: {e}")))?;
        self.api.set_image(&pix);

        let text = self
            .api
            .raw
            .get_utf8_text()
            .map_err(|e| InstagraphError::Recognition(format!("Failed to extract text: {e}")))?;
        let text: &CStr = text.as_ref();
        let text = text
            .to_str()
            .map_err(|e| InstagraphError::Recognition(format!("Engine output is not UTF-8: {e}")))?
            .to_string();

        debug!(
            language = %self.language,
            accuracy = %self.accuracy,
            chars = text.len(),
            "Tesseract recognition finished"
        );
        Ok(Some(text))
    }
}
