//! Geometry between sensor pixels, anchor-local vertices and world space.

pub mod reproject;
pub mod unproject;

pub use reproject::{ProjectionView, Reprojector, SensorOrientation};
pub use unproject::{depth_pixel_from_world, unproject_depth_pixel, unproject_mesh_vertex};
