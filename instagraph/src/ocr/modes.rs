use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Speed/accuracy trade-off of the recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyMode {
    /// Legacy engine only: quickest, least accurate.
    Fast,
    /// Neural (LSTM) recognizer only: slower, more accurate.
    Accurate,
    /// Both passes, results reconciled: slowest, most accurate.
    #[default]
    Combined,
}

impl AccuracyMode {
    /// Tesseract `tessedit_ocr_engine_mode` value.
    pub fn code(self) -> u8 {
        match self {
            AccuracyMode::Fast => 0,
            AccuracyMode::Accurate => 1,
            AccuracyMode::Combined => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccuracyMode::Fast => "fast",
            AccuracyMode::Accurate => "accurate",
            AccuracyMode::Combined => "combined",
        }
    }
}

impl fmt::Display for AccuracyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccuracyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" | "0" => Ok(AccuracyMode::Fast),
            "accurate" | "1" => Ok(AccuracyMode::Accurate),
            "combined" | "2" => Ok(AccuracyMode::Combined),
            other => Err(format!(
                "unknown accuracy mode '{other}' (expected fast, accurate or combined)"
            )),
        }
    }
}

/// Expected layout of the text on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Orientation and script detection only.
    OsdOnly,
    /// Automatic segmentation with orientation and script detection.
    AutoOsd,
    /// Automatic segmentation, no OSD and no OCR.
    AutoOnly,
    /// Fully automatic segmentation, no OSD.
    #[default]
    Auto,
    /// A single column of text of variable sizes.
    SingleColumn,
    /// A single uniform block of vertically aligned text.
    SingleBlockVertText,
    /// A single uniform block of text.
    SingleBlock,
    SingleLine,
    SingleWord,
    /// A single word in a circle.
    CircleWord,
    SingleChar,
    /// As much text as possible, in no particular order.
    SparseText,
    /// Sparse text with orientation and script detection.
    SparseTextOsd,
    /// A single text line, bypassing Tesseract-specific hacks.
    RawLine,
}

const SEGMENTATION_MODES: [(SegmentationMode, &str); 14] = [
    (SegmentationMode::OsdOnly, "osd_only"),
    (SegmentationMode::AutoOsd, "auto_osd"),
    (SegmentationMode::AutoOnly, "auto_only"),
    (SegmentationMode::Auto, "auto"),
    (SegmentationMode::SingleColumn, "single_column"),
    (SegmentationMode::SingleBlockVertText, "single_block_vert_text"),
    (SegmentationMode::SingleBlock, "single_block"),
    (SegmentationMode::SingleLine, "single_line"),
    (SegmentationMode::SingleWord, "single_word"),
    (SegmentationMode::CircleWord, "circle_word"),
    (SegmentationMode::SingleChar, "single_char"),
    (SegmentationMode::SparseText, "sparse_text"),
    (SegmentationMode::SparseTextOsd, "sparse_text_osd"),
    (SegmentationMode::RawLine, "raw_line"),
];

impl SegmentationMode {
    /// Tesseract `tessedit_pageseg_mode` value.
    pub fn code(self) -> u8 {
        SEGMENTATION_MODES
            .iter()
            .position(|(mode, _)| *mode == self)
            .unwrap_or(3) as u8
    }

    pub fn as_str(self) -> &'static str {
        SEGMENTATION_MODES
            .iter()
            .find(|(mode, _)| *mode == self)
            .map(|(_, name)| *name)
            .unwrap_or("auto")
    }

    pub fn from_code(code: u8) -> Option<Self> {
        SEGMENTATION_MODES.get(code as usize).map(|(mode, _)| *mode)
    }
}

impl fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");

        if let Ok(code) = normalized.parse::<u8>() {
            return SegmentationMode::from_code(code)
                .ok_or_else(|| format!("page segmentation mode {code} is out of range (0-13)"));
        }

        SEGMENTATION_MODES
            .iter()
            .find(|(_, name)| *name == normalized)
            .map(|(mode, _)| *mode)
            .ok_or_else(|| format!("unknown page segmentation mode '{}'", s.trim()))
    }
}
