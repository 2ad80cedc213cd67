use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstagraphError {
    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Filter failure: {0}")]
    FilterFailure(String),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Pipeline run cancelled")]
    Cancelled,

    #[error("Pipeline run timed out after {0:?}")]
    Timeout(Duration),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl InstagraphError {
    /// Stage failures the orchestrator absorbs by falling back to the
    /// previous stage's image.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            InstagraphError::RenderFailure(_) | InstagraphError::FilterFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, InstagraphError>;
