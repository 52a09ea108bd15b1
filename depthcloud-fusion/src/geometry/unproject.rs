//! Unprojection of depth pixels and mesh vertices into world space.
//!
//! Camera space follows the tracking layer's convention: x to the right of
//! the depth grid, y along increasing rows, and the viewing direction along -z.
//! No validity filtering happens here.

use depthcloud_data::{Intrinsics, Pose};
use glam::Vec3;

/// World point seen at depth pixel `(px, py)` with depth `depth` meters.
///
/// Camera-space coordinates are `X = (px - cx) * d / fx`,
/// `Y = (py - cy) * d / fy`, `Z = -d`; the result is `pose * [X, Y, Z, 1]`.
#[inline]
pub fn unproject_depth_pixel(
    px: f32,
    py: f32,
    depth: f32,
    intrinsics: &Intrinsics,
    pose: &Pose,
) -> Vec3 {
    let x = (px - intrinsics.cx) * depth / intrinsics.fx;
    let y = (py - intrinsics.cy) * depth / intrinsics.fy;
    pose.transform_point(Vec3::new(x, y, -depth))
}

/// World position of an anchor-local mesh vertex.
#[inline]
pub fn unproject_mesh_vertex(local: Vec3, anchor_transform: &Pose) -> Vec3 {
    anchor_transform.transform_point(local)
}

/// Inverse of [`unproject_depth_pixel`]: the `(px, py, depth)` a world point
/// maps back to in the depth grid. Returns `None` when the point lies on the
/// camera plane or the result is not finite.
pub fn depth_pixel_from_world(
    world: Vec3,
    intrinsics: &Intrinsics,
    pose: &Pose,
) -> Option<(f32, f32, f32)> {
    let camera = pose.inverse().transform_point(world);
    let depth = -camera.z;
    if depth == 0.0 {
        return None;
    }
    let px = camera.x * intrinsics.fx / depth + intrinsics.cx;
    let py = camera.y * intrinsics.fy / depth + intrinsics.cy;
    (px.is_finite() && py.is_finite() && depth.is_finite()).then_some((px, py, depth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_unproject_principal_point() {
        let intr = Intrinsics::new(100.0, 100.0, 50.0, 50.0);
        let p = unproject_depth_pixel(50.0, 50.0, 2.0, &intr, &Pose::IDENTITY);
        assert_eq!(p, Vec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_unproject_off_axis_identity_pose() {
        let intr = Intrinsics::new(100.0, 100.0, 50.0, 50.0);
        let p = unproject_depth_pixel(10.0, 10.0, 1.0, &intr, &Pose::IDENTITY);
        assert!(p.abs_diff_eq(Vec3::new(-0.4, -0.4, -1.0), 1e-6));
    }

    #[test]
    fn test_unproject_applies_pose() {
        let intr = Intrinsics::new(100.0, 100.0, 50.0, 50.0);
        let pose = Pose::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let p = unproject_depth_pixel(50.0, 50.0, 1.0, &intr, &pose);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 0.0, -1.0), 1e-6));
    }

    #[test]
    fn test_unproject_mesh_vertex() {
        let anchor = Pose::from_rotation_translation(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 0.0, -2.0),
        );
        let p = unproject_mesh_vertex(Vec3::X, &anchor);
        assert!(p.abs_diff_eq(Vec3::new(0.0, 1.0, -2.0), 1e-6));
    }

    #[test]
    fn test_round_trip_reproduces_pixel() {
        let intr = Intrinsics::new(212.0, 208.5, 127.5, 95.5);
        let pose = Pose::from_rotation_translation(
            Quat::from_euler(glam::EulerRot::YXZ, 0.4, -0.2, 0.1),
            Vec3::new(0.3, 1.4, -0.8),
        );
        let max_range = 8.0;

        for py in (0..192).step_by(17) {
            for px in (0..256).step_by(23) {
                for depth in [0.05f32, 0.5, 1.0, 2.75, max_range] {
                    let world = unproject_depth_pixel(px as f32, py as f32, depth, &intr, &pose);
                    let (u, v, d) = depth_pixel_from_world(world, &intr, &pose).unwrap();
                    assert_eq!(u.round() as i32, px, "px at depth {depth}");
                    assert_eq!(v.round() as i32, py, "py at depth {depth}");
                    assert!((d - depth).abs() < 1e-3 * depth.max(1.0));
                }
            }
        }
    }

    #[test]
    fn test_inverse_rejects_camera_plane() {
        let intr = Intrinsics::new(100.0, 100.0, 50.0, 50.0);
        assert!(depth_pixel_from_world(Vec3::new(1.0, 1.0, 0.0), &intr, &Pose::IDENTITY).is_none());
    }
}
