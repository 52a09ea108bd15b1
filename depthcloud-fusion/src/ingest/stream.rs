//! Sensor stream interfaces for real-time data ingestion

use crate::ingest::capabilities::{Capabilities, SessionConfiguration};
use crate::ingest::events::SensorFrameEvent;
use depthcloud_data::FrameError;

/// Trait for sensor-tracking sources.
///
/// Buffers are lent to `handler` for the duration of the call only, which is
/// what keeps the pipeline from holding on to a frame after its callback.
pub trait SensorStream {
    /// Deliver the events of the next sensor frame to `handler`, in order.
    /// Returns `Ok(false)` when the stream ends.
    fn next_event(
        &mut self,
        handler: &mut dyn FnMut(SensorFrameEvent<'_>),
    ) -> Result<bool, StreamError>;

    fn capabilities(&self) -> Capabilities;

    /// Get the frame rate (frames per second), if known
    fn frame_rate(&self) -> Option<f32>;

    /// Check if the stream is still active
    fn is_active(&self) -> bool;
}

/// Tracking controls exposed by the sensor layer. Called from the control
/// thread, concurrently with event delivery.
pub trait TrackingControl: Send + Sync {
    /// Start (or restart) tracking with `configuration`.
    fn run(&self, configuration: &SessionConfiguration);

    /// Restart tracking and drop every existing anchor.
    fn reset_tracking(&self);
}

/// Errors that can occur during stream processing
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed sensor buffer: {0}")]
    Frame(#[from] FrameError),
    #[error("Tracking session is not running")]
    NotRunning,
    #[error("Stream ended unexpectedly")]
    StreamEnded,
    #[error("Invalid frame data: {0}")]
    InvalidData(String),
}
