//! Camera intrinsics and rigid poses.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Pinhole camera parameters, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Rescale intrinsics expressed at resolution `from` to resolution `to`.
    ///
    /// Returns `self` unchanged if either resolution has a zero dimension.
    pub fn rescaled(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        if from.0 == 0 || from.1 == 0 || to.0 == 0 || to.1 == 0 {
            return *self;
        }
        let sx = to.0 as f32 / from.0 as f32;
        let sy = to.1 as f32 / from.1 as f32;
        Self {
            fx: self.fx * sx,
            fy: self.fy * sy,
            cx: self.cx * sx,
            cy: self.cy * sy,
        }
    }
}

/// Rigid transform from a local frame (camera or mesh anchor) to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose(Mat4);

impl Pose {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    pub fn new(matrix: Mat4) -> Self {
        Self(matrix)
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self(Mat4::from_translation(translation))
    }

    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self(Mat4::from_rotation_translation(rotation, translation))
    }

    /// Column-major matrix as delivered by most tracking layers.
    pub fn from_cols_array(cols: &[f32; 16]) -> Self {
        Self(Mat4::from_cols_array(cols))
    }

    pub fn matrix(&self) -> Mat4 {
        self.0
    }

    /// `self * [p, 1]`, keeping the xyz part.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        (self.0 * point.extend(1.0)).truncate()
    }

    /// World-to-local transform.
    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for Pose {
    fn from(matrix: Mat4) -> Self {
        Self(matrix)
    }
}

/// Camera pose and intrinsics for one frame.
///
/// This is the only per-frame camera data the pipeline keeps across callbacks;
/// it is copied out of each event and never borrows a sensor buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub pose: Pose,
    pub intrinsics: Intrinsics,
}

impl CameraState {
    pub fn new(pose: Pose, intrinsics: Intrinsics) -> Self {
        Self { pose, intrinsics }
    }
}
