//! Depthcloud Capture - Sensor sources for the fusion pipeline
//!
//! This crate provides implementations of the `SensorStream` and
//! `TrackingControl` traits from depthcloud-fusion:
//!
//! - A deterministic replay device that renders a tilted plane into depth
//!   maps, mesh anchors and NV12 color frames
//! - NV12 encoding of RGB images into biplanar luma/chroma frames
//!
//! ## Example
//!
//! ```ignore
//! use depthcloud_capture::{ReplayConfig, ReplayDevice};
//! use depthcloud_fusion::{FusionSession, PipelineConfig, SensorStream};
//!
//! let (mut device, control) = ReplayDevice::new(ReplayConfig::default())?;
//! let (mut session, controller) =
//!     FusionSession::configure(PipelineConfig::default(), &device.capabilities(), control)
//!         .expect("unsupported device");
//! controller.dispatch("start")?;
//! while session.drive(&mut device)? {}
//! ```

mod nv12;
mod replay;
mod source;

pub use nv12::Nv12Image;
pub use replay::{GradientSource, ReplayConfig, ReplayControl, ReplayDevice};
pub use source::{CaptureError, CaptureSource, FrameData};

// Re-export the stream traits for convenience
pub use depthcloud_fusion::ingest::{SensorStream, StreamError, TrackingControl};
