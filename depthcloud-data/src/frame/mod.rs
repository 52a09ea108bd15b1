//! Borrowed views over sensor buffers.
//!
//! Every view here borrows memory owned by the sensor layer and is only valid
//! for the duration of the callback that produced it. Accessors are
//! bounds-checked against explicit `(width, height, stride)` descriptors and
//! return `None` instead of reading outside the buffer.

mod color;
mod depth;
mod mesh;

pub use color::{ColorFrame, PlaneView};
pub use depth::DepthFrame;
pub use mesh::{MeshAnchor, MeshVertexBuffer, VERTEX_SIZE};

use thiserror::Error;

/// Errors raised when a buffer does not match its declared layout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Buffer too small: need {needed} bytes/values, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("Row stride {stride} is smaller than row width {row} bytes")]
    StrideTooSmall { stride: usize, row: usize },

    #[error("Vertex stride {0} is smaller than a 3-float position")]
    VertexStrideTooSmall(usize),

    #[error("Depth buffer is not 4-byte aligned or has a trailing partial value")]
    Misaligned,

    #[error("Unexpected channel count: expected {expected}, got {actual}")]
    ChannelCount { expected: usize, actual: usize },
}
