//! Depthcloud Fusion Crate
//!
//! Turns per-frame sensor data from a handheld depth device into colored
//! world-space points. It focuses on the numeric core: unprojection, world
//! transformation, reprojection into the color image, 4:2:0 color decoding,
//! rate limiting and adaptive downsampling.
//!
//! ## Modules
//!
//! - [`ingest`]: Sensor events and the collaborator traits a device implements
//! - [`geometry`]: Unprojection of depth pixels and mesh vertices, reprojection
//! - [`color`]: Biplanar luma/chroma sampling
//! - [`throttle`]: Output rate limiting
//! - [`pipeline`]: Configuration, the per-frame point cloud builder and session
//! - [`control`]: Recording state and the start/stop/reset command surface
//! - [`sink`]: Output sinks for point batches

pub mod color;
pub mod control;
pub mod geometry;
pub mod ingest;
pub mod pipeline;
pub mod sink;
pub mod throttle;

pub use control::{ControlCommand, ControlError, Controller, RecordingState, SessionState};
pub use ingest::{SensorFrameEvent, SensorStream, StreamError, TrackingControl};
pub use pipeline::{FusionSession, PipelineConfig, PointCloudBuilder, RangePreset};
pub use sink::{ChannelSink, PointSink, SinkMessage};
