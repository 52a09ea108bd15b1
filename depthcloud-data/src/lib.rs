//! Depthcloud Data Crate
//!
//! Plain data shared by the depthcloud crates: camera intrinsics and poses,
//! borrowed views over sensor buffers (depth grids, biplanar color images,
//! mesh vertex buffers) and the colored point records produced per frame.
//! Nothing here performs projection or color fusion; see `depthcloud-fusion`.

pub mod camera;
pub mod frame;
pub mod types;

pub use camera::{CameraState, Intrinsics, Pose};
pub use frame::{ColorFrame, DepthFrame, FrameError, MeshAnchor, MeshVertexBuffer, PlaneView};
pub use types::{PointBatch, PointRecord};
