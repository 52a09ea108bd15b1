//! End-to-end behaviour through the public session API.

use depthcloud_data::{CameraState, DepthFrame, Intrinsics, MeshAnchor, MeshVertexBuffer, Pose};
use depthcloud_fusion::ingest::{DepthUpdate, GenerationMode, MeshAnchorUpdate, SessionConfiguration};
use depthcloud_fusion::{
    ChannelSink, Controller, FusionSession, PipelineConfig, RecordingState, SensorFrameEvent,
    SinkMessage, TrackingControl,
};
use glam::Vec3;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

#[derive(Default)]
struct StubTracking {
    resets: AtomicUsize,
}

impl TrackingControl for StubTracking {
    fn run(&self, _configuration: &SessionConfiguration) {}

    fn reset_tracking(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

fn recording_session(
    config: PipelineConfig,
    mode: GenerationMode,
) -> (FusionSession, Controller, Receiver<SinkMessage>) {
    let session = FusionSession::new(config, mode);
    let controller = session.controller(Arc::new(StubTracking::default()));
    let (sink, receiver) = ChannelSink::new();
    session.attach_sink(Arc::new(sink));
    controller.dispatch("start").unwrap();
    (session, controller, receiver)
}

fn camera() -> CameraState {
    CameraState::new(Pose::IDENTITY, Intrinsics::new(100.0, 100.0, 50.0, 50.0))
}

/// 20x20 grid that is invalid everywhere except `(10, 10)`.
fn single_pixel_depth(depth: f32) -> Vec<f32> {
    let mut data = vec![f32::NAN; 20 * 20];
    data[10 * 20 + 10] = depth;
    data
}

fn batches(receiver: &Receiver<SinkMessage>) -> Vec<depthcloud_data::PointBatch> {
    receiver
        .try_iter()
        .filter_map(|message| match message {
            SinkMessage::Batch(batch) => Some(batch),
            SinkMessage::Clear => None,
        })
        .collect()
}

#[test]
fn scenario_a_single_valid_pixel() {
    let (mut session, _controller, receiver) =
        recording_session(PipelineConfig::default(), GenerationMode::DepthMapDriven);
    let depth = single_pixel_depth(1.0);
    let frame = DepthFrame::new(&depth, 20, 20).unwrap();

    session.on_event(SensorFrameEvent::DepthUpdate(
        DepthUpdate::new(0.0, camera()).with_raw_depth(frame),
    ));

    let batches = batches(&receiver);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    let point = batches[0].points()[0];
    assert!(point.position().abs_diff_eq(Vec3::new(-0.4, -0.4, -1.0), 1e-5));
    assert!(point.is_valid());
}

#[test]
fn scenario_b_depth_beyond_max_range() {
    let (mut session, _controller, receiver) =
        recording_session(PipelineConfig::coarse(), GenerationMode::DepthMapDriven);
    assert_eq!(session.builder().config().max_range, 8.0);
    let depth = single_pixel_depth(10.0);
    let frame = DepthFrame::new(&depth, 20, 20).unwrap();

    let emitted = session.on_event(SensorFrameEvent::DepthUpdate(
        DepthUpdate::new(0.0, camera()).with_raw_depth(frame),
    ));

    assert_eq!(emitted, 0);
    assert!(batches(&receiver).is_empty());
}

#[test]
fn scenario_c_mesh_without_color() {
    let (mut session, _controller, receiver) =
        recording_session(PipelineConfig::default(), GenerationMode::MeshDriven);
    let positions = [[0.0, 0.0, -1.0], [1.0, 0.0, -1.0], [0.0, 1.0, -1.0]];
    let anchors = [MeshAnchor::new(
        1,
        Pose::IDENTITY,
        MeshVertexBuffer::from_positions(&positions),
    )];

    session.on_event(SensorFrameEvent::MeshAnchorUpdate(MeshAnchorUpdate::new(
        0.0, &anchors,
    )));

    let batches = batches(&receiver);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    for point in batches[0].points() {
        assert_eq!(point.color(), Vec3::splat(0.6));
    }
    assert_eq!(batches[0].as_floats().len(), 3 * 6);
}

#[test]
fn reset_while_recording_goes_idle_without_emitting() {
    let session = FusionSession::new(PipelineConfig::default(), GenerationMode::DepthMapDriven);
    let tracking = Arc::new(StubTracking::default());
    let controller = session.controller(tracking.clone());
    let (sink, receiver) = ChannelSink::new();
    session.attach_sink(Arc::new(sink));

    controller.dispatch("start").unwrap();
    controller.dispatch("reset").unwrap();

    assert_eq!(session.state().recording_state(), RecordingState::Idle);
    assert_eq!(tracking.resets.load(Ordering::SeqCst), 1);
    let messages: Vec<_> = receiver.try_iter().collect();
    assert_eq!(messages, vec![SinkMessage::Clear]);
}

#[test]
fn frames_inside_interval_are_dropped() {
    let (mut session, _controller, receiver) =
        recording_session(PipelineConfig::default(), GenerationMode::DepthMapDriven);
    let depth = single_pixel_depth(1.0);
    let frame = DepthFrame::new(&depth, 20, 20).unwrap();
    let event = SensorFrameEvent::DepthUpdate(DepthUpdate::new(0.0, camera()).with_raw_depth(frame));
    let t0 = Instant::now();

    assert_eq!(session.on_event_at(event, t0), 1);
    assert_eq!(session.on_event_at(event, t0 + Duration::from_millis(40)), 0);
    assert_eq!(session.on_event_at(event, t0 + Duration::from_millis(80)), 0);
    assert_eq!(session.on_event_at(event, t0 + Duration::from_millis(120)), 1);
    assert_eq!(batches(&receiver).len(), 2);
}

#[test]
fn invalid_depths_never_produce_points() {
    for depth in [0.0, -0.5, 3.01, f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        let (mut session, _controller, receiver) =
            recording_session(PipelineConfig::high_confidence(), GenerationMode::DepthMapDriven);
        let data = single_pixel_depth(depth);
        let frame = DepthFrame::new(&data, 20, 20).unwrap();
        session.on_event(SensorFrameEvent::DepthUpdate(
            DepthUpdate::new(0.0, camera()).with_raw_depth(frame),
        ));
        assert!(batches(&receiver).is_empty(), "depth {depth} produced points");
    }
}

#[test]
fn unknown_command_keeps_state() {
    let (session, controller, _receiver) =
        recording_session(PipelineConfig::default(), GenerationMode::DepthMapDriven);
    assert!(controller.dispatch("pause").is_err());
    assert_eq!(session.state().recording_state(), RecordingState::Recording);
}
