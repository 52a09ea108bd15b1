//! Color sampling from biplanar 4:2:0 luma/chroma images.
//!
//! Uses the full-range BT.601 matrix with chroma centred on 128:
//!
//! - R = Y + 1.402 Cr
//! - G = Y - 0.344136 Cb - 0.714136 Cr
//! - B = Y + 1.772 Cb

use depthcloud_data::ColorFrame;
use glam::Vec3;
use image::{Rgb, RgbImage};

/// Color used when a point cannot be sampled.
pub const NEUTRAL_GRAY: Vec3 = Vec3::new(0.6, 0.6, 0.6);

/// RGB in 0-1 for one luma sample and its chroma pair.
#[inline]
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> Vec3 {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;

    let r = y + 1.402 * cr;
    let g = y - 0.344136 * cb - 0.714136 * cr;
    let b = y + 1.772 * cb;

    Vec3::new(r, g, b).clamp(Vec3::ZERO, Vec3::splat(255.0)) / 255.0
}

/// Color of pixel `(px, py)` in `frame`.
///
/// The chroma pair is read at `(px / 2, py / 2)`. Returns `None` when the
/// pixel lies outside the luma plane or its chroma pair outside the chroma
/// plane.
pub fn sample(px: usize, py: usize, frame: &ColorFrame<'_>) -> Option<Vec3> {
    let y = frame.luma().get(px, py, 0)?;
    let chroma = frame.chroma();
    let cb = chroma.get(px / 2, py / 2, 0)?;
    let cr = chroma.get(px / 2, py / 2, 1)?;
    Some(ycbcr_to_rgb(y, cb, cr))
}

/// Decode the whole frame for previews. Pixels without a chroma pair are black.
pub fn decode_rgb_image(frame: &ColorFrame<'_>) -> RgbImage {
    let (width, height) = frame.dimensions();
    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        match sample(x as usize, y as usize, frame) {
            Some(color) => {
                let c = (color * 255.0).round();
                Rgb([c.x as u8, c.y as u8, c.z as u8])
            }
            None => Rgb([0, 0, 0]),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthcloud_data::PlaneView;

    fn assert_color(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-3),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_neutral_chroma_is_gray() {
        assert_color(ycbcr_to_rgb(128, 128, 128), Vec3::splat(128.0 / 255.0));
        assert_color(ycbcr_to_rgb(0, 128, 128), Vec3::ZERO);
        assert_color(ycbcr_to_rgb(255, 128, 128), Vec3::ONE);
    }

    #[test]
    fn test_conversion_clamps() {
        // Strong red chroma pushes R above 255.
        let c = ycbcr_to_rgb(200, 128, 255);
        assert_eq!(c.x, 1.0);
        assert!(c.y >= 0.0 && c.y < 1.0);
        assert!(c.z > 0.0);
    }

    #[test]
    fn test_conversion_matrix() {
        let c = ycbcr_to_rgb(100, 138, 118);
        let expected = Vec3::new(
            100.0 + 1.402 * -10.0,
            100.0 - 0.344136 * 10.0 - 0.714136 * -10.0,
            100.0 + 1.772 * 10.0,
        ) / 255.0;
        assert_color(c, expected);
    }

    #[test]
    fn test_sample_uses_subsampled_chroma() {
        // 4x2 luma, 2x1 chroma. Left chroma pair neutral, right pair blue-ish.
        let luma = [10, 20, 30, 40, 50, 60, 70, 80];
        let chroma = [128, 128, 200, 128];
        let frame = ColorFrame::nv12(&luma, 4, &chroma, 4, 4, 2).unwrap();

        assert_color(sample(1, 1, &frame).unwrap(), Vec3::splat(60.0 / 255.0));
        let right = sample(3, 1, &frame).unwrap();
        assert_color(right, ycbcr_to_rgb(80, 200, 128));
        assert!(right.z > right.x);
    }

    #[test]
    fn test_sample_out_of_bounds() {
        let luma = [0u8; 4 * 2];
        let chroma = [128u8; 2 * 2];
        let frame = ColorFrame::nv12(&luma, 4, &chroma, 4, 4, 2).unwrap();
        assert!(sample(4, 0, &frame).is_none());
        assert!(sample(0, 2, &frame).is_none());
    }

    #[test]
    fn test_sample_edge_with_short_chroma_plane() {
        // Odd-width luma whose chroma plane only covers the first two columns:
        // the last luma column maps to chroma column 2, which is missing.
        let luma = [0u8; 5];
        let chroma_data = [128u8; 4];
        let luma_plane = PlaneView::new(&luma, 5, 1, 5, 1).unwrap();
        let chroma_plane = PlaneView::new(&chroma_data, 2, 1, 4, 2).unwrap();
        let frame = ColorFrame::new(luma_plane, chroma_plane).unwrap();

        assert!(sample(3, 0, &frame).is_some());
        assert!(sample(4, 0, &frame).is_none());
    }

    #[test]
    fn test_sample_last_column_of_padded_planes() {
        // Row strides larger than the visible width: the last pixel must read
        // its own row, never the padding or the next row.
        let luma = [1, 2, 3, 0xAA, 4, 5, 6, 0xAA];
        let chroma = [128, 128, 128, 128, 0xAA, 0xAA];
        let frame = ColorFrame::nv12(&luma, 4, &chroma, 6, 3, 2).unwrap();
        assert_color(sample(2, 1, &frame).unwrap(), Vec3::splat(6.0 / 255.0));
    }

    #[test]
    fn test_decode_rgb_image() {
        let luma = [255u8; 4];
        let chroma = [128u8, 128];
        let frame = ColorFrame::nv12(&luma, 2, &chroma, 2, 2, 2).unwrap();
        let image = decode_rgb_image(&frame);
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 1), &Rgb([255, 255, 255]));
    }
}
