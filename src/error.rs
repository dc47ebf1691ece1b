// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The capture device could not be opened or has gone away. Ends the frame loop.
    #[error("Camera unavailable: {0}")]
    CaptureUnavailable(String),

    /// A single frame could not be grabbed or decoded.
    #[error("Frame capture error: {0}")]
    CaptureFrame(String),

    #[error("Hand detector error: {0}")]
    Detector(String),

    /// The detector process died or stopped answering. It will not recover.
    #[error("Hand detector stopped: {0}")]
    DetectorLost(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),

    #[error("An analysis request is already in flight")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Only a lost capture device is allowed to stop the drawing loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::CaptureUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
