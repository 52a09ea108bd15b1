//! Common capture source types and traits.

use depthcloud_data::FrameError;
use depthcloud_fusion::StreamError;
use image::RgbImage;
use thiserror::Error;

/// Errors that can occur during capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Invalid device configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed frame buffer: {0}")]
    Frame(#[from] FrameError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CaptureError> for StreamError {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::Frame(e) => StreamError::Frame(e),
            CaptureError::Io(e) => StreamError::Io(e),
            other => StreamError::InvalidData(other.to_string()),
        }
    }
}

/// Raw color frame from a capture source.
#[derive(Debug, Clone)]
pub struct FrameData {
    pub image: RgbImage,
    /// Frame timestamp in seconds (relative to stream start).
    pub timestamp: f64,
    /// Sequence number, starting at 1 for the first frame.
    pub frame_number: u64,
}

impl FrameData {
    pub fn new(image: RgbImage, timestamp: f64, frame_number: u64) -> Self {
        Self {
            image,
            timestamp,
            frame_number,
        }
    }

    /// Get image dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Trait for sources of color frames.
///
/// Lower level than `SensorStream`: no pose, depth or mesh. The replay
/// device pairs one with its synthetic geometry.
pub trait CaptureSource {
    /// Get the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<FrameData>, CaptureError>;

    fn frame_rate(&self) -> Option<f32>;

    /// Get the resolution (width, height).
    fn resolution(&self) -> (u32, u32);

    fn is_active(&self) -> bool;

    /// Stop capturing.
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_into_stream_error() {
        let frame = CaptureError::Frame(FrameError::Misaligned);
        assert!(matches!(StreamError::from(frame), StreamError::Frame(FrameError::Misaligned)));

        let other = CaptureError::UnsupportedFormat("yuyv".to_string());
        match StreamError::from(other) {
            StreamError::InvalidData(message) => assert!(message.contains("yuyv")),
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_frame_data_dimensions() {
        let frame = FrameData::new(RgbImage::new(8, 6), 0.0, 1);
        assert_eq!(frame.dimensions(), (8, 6));
    }
}
