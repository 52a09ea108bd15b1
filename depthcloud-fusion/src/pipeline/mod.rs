//! Point generation pipeline
//!
//! - [`PipelineConfig`]: range presets, downsampling and color fusion settings
//! - [`PointCloudBuilder`]: turns one sensor event into point batches
//! - [`FusionSession`]: wires a builder to shared state and an output sink

pub mod builder;
pub mod config;
pub mod session;

pub use builder::PointCloudBuilder;
pub use config::{PipelineConfig, RangePreset};
pub use session::FusionSession;
