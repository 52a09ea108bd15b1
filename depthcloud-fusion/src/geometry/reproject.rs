//! Reprojection of world points into the color image.
//!
//! The color buffer is delivered in the sensor's native orientation. Camera
//! space is x right, y up, looking down -z; the image has rows increasing
//! downwards, so `v = cy - fy * y / depth`.
//!
//! Depth unprojection takes y along increasing rows instead, so a depth pixel
//! on row `py` reprojects to color row `2 * cy - py` for the same intrinsics.
//! Both conventions come from the tracking layer and are kept as delivered.

use depthcloud_data::{CameraState, Intrinsics, Pose};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Orientation of the color buffer relative to the camera's native axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorOrientation {
    /// Native sensor orientation (home button / notch on the right).
    #[default]
    LandscapeRight,
    /// Rotated 180 degrees from the native orientation.
    LandscapeLeft,
}

/// Projects world points into a color image of a fixed orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reprojector {
    orientation: SensorOrientation,
}

impl Reprojector {
    pub fn new(orientation: SensorOrientation) -> Self {
        Self { orientation }
    }

    pub fn orientation(&self) -> SensorOrientation {
        self.orientation
    }

    /// Pixel in a `width` x `height` image that `world` projects to.
    ///
    /// Coordinates are rounded and clamped into the image, so points slightly
    /// outside the frustum take the nearest edge pixel. Returns `None` only for
    /// an empty image or a non-finite projection.
    pub fn project(
        &self,
        world: Vec3,
        pose: &Pose,
        intrinsics: &Intrinsics,
        width: usize,
        height: usize,
    ) -> Option<(usize, usize)> {
        self.view(&CameraState::new(*pose, *intrinsics), width, height)?
            .project(world)
    }

    /// Precompute the world-to-camera transform for many projections against
    /// the same camera and image.
    pub fn view(&self, camera: &CameraState, width: usize, height: usize) -> Option<ProjectionView> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(ProjectionView {
            world_to_camera: camera.pose.inverse().matrix(),
            intrinsics: camera.intrinsics,
            orientation: self.orientation,
            width,
            height,
        })
    }
}

/// A camera and image size ready for repeated projection.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionView {
    world_to_camera: Mat4,
    intrinsics: Intrinsics,
    orientation: SensorOrientation,
    width: usize,
    height: usize,
}

impl ProjectionView {
    /// Sub-pixel image coordinates of `world`, before rounding and clamping.
    pub fn project_continuous(&self, world: Vec3) -> Option<(f32, f32)> {
        let camera = (self.world_to_camera * world.extend(1.0)).truncate();
        let depth = -camera.z;
        let u = self.intrinsics.cx + self.intrinsics.fx * camera.x / depth;
        let v = self.intrinsics.cy - self.intrinsics.fy * camera.y / depth;
        let (u, v) = match self.orientation {
            SensorOrientation::LandscapeRight => (u, v),
            SensorOrientation::LandscapeLeft => (
                self.width as f32 - 1.0 - u,
                self.height as f32 - 1.0 - v,
            ),
        };
        (u.is_finite() && v.is_finite()).then_some((u, v))
    }

    /// Rounded pixel clamped into the image.
    pub fn project(&self, world: Vec3) -> Option<(usize, usize)> {
        let (u, v) = self.project_continuous(world)?;
        let px = (u.round() as i64).clamp(0, self.width as i64 - 1);
        let py = (v.round() as i64).clamp(0, self.height as i64 - 1);
        Some((px as usize, py as usize))
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}
