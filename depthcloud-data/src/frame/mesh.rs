use super::FrameError;
use crate::camera::Pose;
use glam::Vec3;

/// Size in bytes of one packed `[f32; 3]` vertex position.
pub const VERTEX_SIZE: usize = 12;

/// Vertex positions inside a shared buffer: `count` entries, `stride` bytes
/// apart, starting `offset` bytes in. Positions are in the anchor's local space.
#[derive(Debug, Clone, Copy)]
pub struct MeshVertexBuffer<'a> {
    bytes: &'a [u8],
    count: usize,
    stride: usize,
    offset: usize,
}

impl<'a> MeshVertexBuffer<'a> {
    pub fn new(
        bytes: &'a [u8],
        count: usize,
        stride: usize,
        offset: usize,
    ) -> Result<Self, FrameError> {
        if stride < VERTEX_SIZE {
            return Err(FrameError::VertexStrideTooSmall(stride));
        }
        let needed = if count == 0 {
            0
        } else {
            offset + (count - 1) * stride + VERTEX_SIZE
        };
        if bytes.len() < needed {
            return Err(FrameError::BufferTooSmall {
                needed,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes,
            count,
            stride,
            offset,
        })
    }

    /// Tightly packed positions.
    pub fn from_positions(positions: &'a [[f32; 3]]) -> Self {
        Self {
            bytes: bytemuck::cast_slice(positions),
            count: positions.len(),
            stride: VERTEX_SIZE,
            offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Local-space position of vertex `index`.
    pub fn vertex(&self, index: usize) -> Option<Vec3> {
        if index >= self.count {
            return None;
        }
        let start = self.offset + index * self.stride;
        let raw = self.bytes.get(start..start + VERTEX_SIZE)?;
        let position: [f32; 3] = bytemuck::pod_read_unaligned(raw);
        Some(Vec3::from_array(position))
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0..self.count).filter_map(move |i| self.vertex(i))
    }
}

/// A reconstructed surface patch with its own local-to-world transform.
#[derive(Debug, Clone, Copy)]
pub struct MeshAnchor<'a> {
    pub id: u64,
    pub transform: Pose,
    pub vertices: MeshVertexBuffer<'a>,
}

impl<'a> MeshAnchor<'a> {
    pub fn new(id: u64, transform: Pose, vertices: MeshVertexBuffer<'a>) -> Self {
        Self {
            id,
            transform,
            vertices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_buffer_packed() {
        let positions = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let buffer = MeshVertexBuffer::from_positions(&positions);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.vertex(1), Some(Vec3::new(4.0, 5.0, 6.0)));
        assert_eq!(buffer.vertex(2), None);
    }

    #[test]
    fn test_vertex_buffer_stride_and_offset() {
        // 4 leading bytes, then 16-byte vertices (xyz + padding).
        let floats: [f32; 9] = [
            0.0, // offset padding
            1.0, 2.0, 3.0, 99.0, // vertex 0 + pad
            4.0, 5.0, 6.0, 99.0, // vertex 1 + pad
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&floats);
        let buffer = MeshVertexBuffer::new(bytes, 2, 16, 4).unwrap();
        let vertices: Vec<Vec3> = buffer.iter().collect();
        assert_eq!(
            vertices,
            vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]
        );
    }

    #[test]
    fn test_vertex_buffer_rejects_overrun() {
        let bytes = [0u8; 24];
        assert!(MeshVertexBuffer::new(&bytes, 2, 16, 0).is_err());
        assert!(MeshVertexBuffer::new(&bytes, 2, 8, 0).is_err());
        assert!(MeshVertexBuffer::new(&bytes, 0, 16, 100).is_ok());
    }
}
