use super::FrameError;

/// Row-major grid of depth values in meters.
#[derive(Debug, Clone, Copy)]
pub struct DepthFrame<'a> {
    data: &'a [f32],
    width: usize,
    height: usize,
}

impl<'a> DepthFrame<'a> {
    pub fn new(data: &'a [f32], width: usize, height: usize) -> Result<Self, FrameError> {
        let needed = width * height;
        if data.len() < needed {
            return Err(FrameError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// View a raw float32 depth buffer as delivered by the sensor layer.
    pub fn from_bytes(bytes: &'a [u8], width: usize, height: usize) -> Result<Self, FrameError> {
        let data: &[f32] = bytemuck::try_cast_slice(bytes).map_err(|_| FrameError::Misaligned)?;
        Self::new(data, width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Depth at pixel `(x, y)`, or `None` outside the grid.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }
}
