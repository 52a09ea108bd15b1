use super::FrameError;

/// One plane of an image: `height` rows of `stride` bytes, each row holding
/// `width` pixels of `channels` interleaved bytes.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
}

impl<'a> PlaneView<'a> {
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
    ) -> Result<Self, FrameError> {
        let row = width * channels;
        if stride < row {
            return Err(FrameError::StrideTooSmall { stride, row });
        }
        // The last row may stop at its final pixel instead of the full stride.
        let needed = if height == 0 {
            0
        } else {
            (height - 1) * stride + row
        };
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
            stride,
            channels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Byte for `channel` of pixel `(x, y)`, or `None` outside the plane.
    #[inline]
    pub fn get(&self, x: usize, y: usize, channel: usize) -> Option<u8> {
        if x >= self.width || y >= self.height || channel >= self.channels {
            return None;
        }
        self.data
            .get(y * self.stride + x * self.channels + channel)
            .copied()
    }
}

/// Biplanar 4:2:0 color image: a full-resolution luma plane and a
/// half-resolution plane of interleaved Cb/Cr pairs.
#[derive(Debug, Clone, Copy)]
pub struct ColorFrame<'a> {
    luma: PlaneView<'a>,
    chroma: PlaneView<'a>,
}

impl<'a> ColorFrame<'a> {
    pub fn new(luma: PlaneView<'a>, chroma: PlaneView<'a>) -> Result<Self, FrameError> {
        if luma.channels() != 1 {
            return Err(FrameError::ChannelCount {
                expected: 1,
                actual: luma.channels(),
            });
        }
        if chroma.channels() != 2 {
            return Err(FrameError::ChannelCount {
                expected: 2,
                actual: chroma.channels(),
            });
        }
        Ok(Self { luma, chroma })
    }

    /// Build an NV12-style frame from raw planes. The chroma plane dimensions
    /// are the luma dimensions halved and rounded up.
    pub fn nv12(
        luma: &'a [u8],
        luma_stride: usize,
        chroma: &'a [u8],
        chroma_stride: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, FrameError> {
        let luma = PlaneView::new(luma, width, height, luma_stride, 1)?;
        let chroma = PlaneView::new(
            chroma,
            width.div_ceil(2),
            height.div_ceil(2),
            chroma_stride,
            2,
        )?;
        Self::new(luma, chroma)
    }

    pub fn luma(&self) -> &PlaneView<'a> {
        &self.luma
    }

    pub fn chroma(&self) -> &PlaneView<'a> {
        &self.chroma
    }

    /// Luma plane size `(width, height)`; the image's pixel space.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.luma.width(), self.luma.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_view_padded_stride() {
        // 2x2 plane with 2 bytes of row padding.
        let data = [10, 11, 0, 0, 20, 21];
        let plane = PlaneView::new(&data, 2, 2, 4, 1).unwrap();
        assert_eq!(plane.get(0, 0, 0), Some(10));
        assert_eq!(plane.get(1, 1, 0), Some(21));
        assert_eq!(plane.get(2, 0, 0), None);
        assert_eq!(plane.get(0, 0, 1), None);
    }

    #[test]
    fn test_plane_view_rejects_short_stride() {
        let data = [0u8; 16];
        let err = PlaneView::new(&data, 4, 2, 3, 1).unwrap_err();
        assert_eq!(err, FrameError::StrideTooSmall { stride: 3, row: 4 });
    }

    #[test]
    fn test_plane_view_rejects_short_buffer() {
        let data = [0u8; 7];
        assert!(PlaneView::new(&data, 4, 2, 4, 1).is_err());
    }

    #[test]
    fn test_color_frame_nv12_dimensions() {
        let luma = [0u8; 5 * 3];
        let chroma = [0u8; 3 * 2 * 2];
        let frame = ColorFrame::nv12(&luma, 5, &chroma, 6, 5, 3).unwrap();
        assert_eq!(frame.dimensions(), (5, 3));
        assert_eq!(frame.chroma().width(), 3);
        assert_eq!(frame.chroma().height(), 2);
    }

    #[test]
    fn test_color_frame_channel_check() {
        let data = [0u8; 16];
        let luma = PlaneView::new(&data, 2, 2, 4, 2).unwrap();
        let chroma = PlaneView::new(&data, 1, 1, 2, 2).unwrap();
        assert!(matches!(
            ColorFrame::new(luma, chroma),
            Err(FrameError::ChannelCount { expected: 1, .. })
        ));
    }
}
