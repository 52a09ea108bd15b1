//! RGB to NV12 encoding.
//!
//! Full-range BT.601, the inverse of the decoder in `depthcloud_fusion::color`.
//! Each chroma pair is the average of its (up to) 2x2 luma block.

use depthcloud_data::{ColorFrame, FrameError};
use image::RgbImage;

/// An owned NV12 image: a luma plane and an interleaved Cb/Cr plane at half
/// resolution in both axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nv12Image {
    width: usize,
    height: usize,
    luma: Vec<u8>,
    chroma: Vec<u8>,
}

impl Nv12Image {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let (chroma_width, chroma_height) = (width.div_ceil(2), height.div_ceil(2));

        let mut luma = Vec::with_capacity(width * height);
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0.map(f32::from);
            luma.push(to_u8(0.299 * r + 0.587 * g + 0.114 * b));
        }

        let mut chroma = Vec::with_capacity(chroma_width * chroma_height * 2);
        for cy in 0..chroma_height {
            for cx in 0..chroma_width {
                let mut sum = [0.0f32; 3];
                let mut count = 0.0;
                for y in (cy * 2)..(cy * 2 + 2).min(height) {
                    for x in (cx * 2)..(cx * 2 + 2).min(width) {
                        let p = image.get_pixel(x as u32, y as u32).0;
                        for (s, c) in sum.iter_mut().zip(p) {
                            *s += c as f32;
                        }
                        count += 1.0;
                    }
                }
                let [r, g, b] = sum.map(|s| s / count);
                chroma.push(to_u8(128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b));
                chroma.push(to_u8(128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b));
            }
        }

        Self {
            width,
            height,
            luma,
            chroma,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    pub fn chroma(&self) -> &[u8] {
        &self.chroma
    }

    /// Borrow the planes as a frame view. Rows are tightly packed.
    pub fn as_frame(&self) -> Result<ColorFrame<'_>, FrameError> {
        ColorFrame::nv12(
            &self.luma,
            self.width,
            &self.chroma,
            self.width.div_ceil(2) * 2,
            self.width,
            self.height,
        )
    }
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
