//! Point records and batches handed to the output sink.
//!
//! A batch is laid out in memory exactly as the sink expects it on the wire:
//! repeating `[x, y, z, r, g, b]` tuples of `f32`.

use glam::Vec3;

/// Number of `f32` values per point in the flat output layout.
pub const FLOATS_PER_POINT: usize = 6;

/// A colored point in world space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointRecord {
    /// World position in meters.
    pub position: [f32; 3],
    /// RGB color, each channel in 0-1.
    pub color: [f32; 3],
}

impl PointRecord {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn color(&self) -> Vec3 {
        Vec3::from_array(self.color)
    }

    /// True when the position is finite and every color channel lies in 0-1.
    pub fn is_valid(&self) -> bool {
        self.position().is_finite() && self.color.iter().all(|c| (0.0..=1.0).contains(c))
    }
}

/// Ordered points produced by one builder invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBatch {
    points: Vec<PointRecord>,
    /// Sensor timestamp (seconds) of the frame the batch was built from.
    pub timestamp: f64,
}

impl PointBatch {
    pub fn new(points: Vec<PointRecord>, timestamp: f64) -> Self {
        Self { points, timestamp }
    }

    /// Empty batch with room for `capacity` points.
    pub fn with_capacity(capacity: usize, timestamp: f64) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            timestamp,
        }
    }

    pub fn push(&mut self, point: PointRecord) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    pub fn into_points(self) -> Vec<PointRecord> {
        self.points
    }

    /// Flat `[x, y, z, r, g, b]` view over the batch, without copying.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.points)
    }

    /// Native-endian byte view over the batch, without copying.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }

    /// Little-endian float32 encoding of the flat layout.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.as_floats()
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }
}

impl From<Vec<PointRecord>> for PointBatch {
    fn from(points: Vec<PointRecord>) -> Self {
        Self::new(points, 0.0)
    }
}
