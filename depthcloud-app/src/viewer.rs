//! Downstream consumer of the point stream.
//!
//! Stands in for a live viewer: it keeps every point received since the last
//! reset and can dump them as raw little-endian `[x, y, z, r, g, b]` floats.

use depthcloud_data::{PointBatch, PointRecord};
use depthcloud_fusion::SinkMessage;
use glam::Vec3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::Receiver;
use tracing::{debug, info};

/// Accumulated points plus a few counters.
#[derive(Debug, Default)]
pub struct PointAccumulator {
    points: Vec<PointRecord>,
    batches: usize,
    clears: usize,
    last_timestamp: Option<f64>,
}

impl PointAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume messages until every sender is gone.
    pub fn drain(receiver: Receiver<SinkMessage>) -> Self {
        let mut accumulator = Self::new();
        for message in receiver {
            accumulator.apply(message);
        }
        info!(
            "Point stream closed: {} points from {} batches, {} resets",
            accumulator.points.len(),
            accumulator.batches,
            accumulator.clears
        );
        accumulator
    }

    pub fn apply(&mut self, message: SinkMessage) {
        match message {
            SinkMessage::Batch(batch) => self.push(batch),
            SinkMessage::Clear => {
                debug!("Clearing {} accumulated points", self.points.len());
                self.points.clear();
                self.clears += 1;
            }
        }
    }

    fn push(&mut self, batch: PointBatch) {
        self.batches += 1;
        self.last_timestamp = Some(batch.timestamp);
        self.points.extend(batch.into_points());
    }

    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// Axis-aligned bounds of the accumulated points.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.points.iter().map(PointRecord::position);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Write the points as raw little-endian floats, six per point.
    pub fn write_raw(&self, path: &Path) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        let batch = PointBatch::new(self.points.clone(), self.last_timestamp.unwrap_or(0.0));
        writer.write_all(&batch.to_le_bytes())?;
        writer.flush()?;
        info!("Wrote {} points to {}", self.points.len(), path.display());
        Ok(())
    }
}
