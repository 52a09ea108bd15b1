//! Output sinks for point batches.
//!
//! A batch is a one-shot push. Whatever buffering or dropping happens after
//! that belongs to the sink.

use depthcloud_data::PointBatch;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::debug;

/// Receives emitted batches and reset notifications.
pub trait PointSink: Send + Sync {
    fn push(&self, batch: PointBatch);

    /// Downstream visualization state should be discarded.
    fn clear(&self) {}
}

/// Message carried by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkMessage {
    Batch(PointBatch),
    Clear,
}

/// Forwards batches over an unbounded channel to a consumer thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<SinkMessage>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<SinkMessage>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }

    fn send(&self, message: SinkMessage) {
        if self.sender.send(message).is_err() {
            debug!("Point sink receiver dropped, discarding message");
        }
    }
}

impl PointSink for ChannelSink {
    fn push(&self, batch: PointBatch) {
        self.send(SinkMessage::Batch(batch));
    }

    fn clear(&self) {
        self.send(SinkMessage::Clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthcloud_data::PointRecord;
    use glam::Vec3;

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (sink, receiver) = ChannelSink::new();
        let batch = PointBatch::new(vec![PointRecord::new(Vec3::ONE, Vec3::ZERO)], 1.0);
        sink.push(batch.clone());
        sink.clear();

        assert_eq!(receiver.recv().unwrap(), SinkMessage::Batch(batch));
        assert_eq!(receiver.recv().unwrap(), SinkMessage::Clear);
    }

    #[test]
    fn test_dropped_receiver_is_not_an_error() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        sink.push(PointBatch::default());
    }
}
