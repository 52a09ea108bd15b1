//! Data ingestion module
//!
//! Provides the interface between a sensor-tracking layer and the pipeline:
//! - Sensor events (depth frames, mesh anchors, pose updates)
//! - Device capabilities and the tracking configuration derived from them
//! - Stream and tracking-control traits implemented by capture backends

pub mod capabilities;
pub mod events;
pub mod stream;

pub use capabilities::{Capabilities, GenerationMode, SceneReconstruction, SessionConfiguration};
pub use events::{DepthUpdate, MeshAnchorUpdate, PoseUpdate, SensorFrameEvent};
pub use stream::{SensorStream, StreamError, TrackingControl};
