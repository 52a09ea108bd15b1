//! Error types for the depthcloud binary.

use depthcloud_capture::CaptureError;
use depthcloud_fusion::StreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid command schedule: {0}")]
    Schedule(String),

    #[error("Device supports neither scene depth nor scene reconstruction")]
    Unsupported,

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
