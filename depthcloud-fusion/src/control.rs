//! Recording state, shared session state and the control command surface.

use crate::ingest::TrackingControl;
use crate::sink::PointSink;
use crate::throttle::FrameRateLimiter;
use std::str::FromStr;
use depthcloud_data::PointBatch;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, trace, warn};

/// Whether batches are emitted. Sensor tracking runs in both states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

impl RecordingState {
    fn to_u8(self) -> u8 {
        match self {
            RecordingState::Idle => 0,
            RecordingState::Recording => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => RecordingState::Recording,
            _ => RecordingState::Idle,
        }
    }
}

/// The only state shared between the sensor callback thread and the control
/// thread: the recording flag, the rate limiter's last emission time and the
/// attached output sink.
///
/// Batches are built outside any lock, so a stop or reset can land while one
/// is in flight. Every transition to `Idle` bumps the epoch under the delivery
/// lock, and [`deliver`](Self::deliver) drops batches whose epoch is stale.
/// A batch is therefore never pushed after the `Clear` of a reset.
pub struct SessionState {
    recording: AtomicU8,
    epoch: AtomicU64,
    delivery: Mutex<()>,
    limiter: FrameRateLimiter,
    sink: RwLock<Option<Arc<dyn PointSink>>>,
}

impl SessionState {
    pub fn new(emit_interval: Duration) -> Self {
        Self {
            recording: AtomicU8::new(RecordingState::Idle.to_u8()),
            epoch: AtomicU64::new(0),
            delivery: Mutex::new(()),
            limiter: FrameRateLimiter::new(emit_interval),
            sink: RwLock::new(None),
        }
    }

    pub fn recording_state(&self) -> RecordingState {
        RecordingState::from_u8(self.recording.load(Ordering::Acquire))
    }

    pub fn set_recording_state(&self, state: RecordingState) {
        let _delivery = self.lock_delivery();
        if state == RecordingState::Idle {
            self.epoch.fetch_add(1, Ordering::AcqRel);
        }
        self.recording.store(state.to_u8(), Ordering::Release);
    }

    /// Force `Idle` and tell the sink to discard what it holds, as one step
    /// with respect to [`deliver`](Self::deliver).
    pub fn stop_and_clear(&self) {
        let _delivery = self.lock_delivery();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.recording
            .store(RecordingState::Idle.to_u8(), Ordering::Release);
        if let Some(sink) = self.sink() {
            sink.clear();
        }
    }

    /// Current epoch. Take it before building batches and hand it back to
    /// [`deliver`](Self::deliver).
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Push `batches` to the attached sink unless recording stopped since
    /// `epoch` was taken. Returns the number of batches pushed.
    ///
    /// Runs under the delivery lock, so sinks must not block.
    pub fn deliver(&self, epoch: u64, batches: Vec<PointBatch>) -> usize {
        let _delivery = self.lock_delivery();
        if self.epoch() != epoch {
            trace!("Dropping {} batches built before a stop", batches.len());
            return 0;
        }
        let Some(sink) = self.sink() else {
            return 0;
        };
        let count = batches.len();
        for batch in batches {
            sink.push(batch);
        }
        count
    }

    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_recording(&self) -> bool {
        self.recording_state() == RecordingState::Recording
    }

    pub fn limiter(&self) -> &FrameRateLimiter {
        &self.limiter
    }

    /// Both emission gates: recording, then the rate limiter. The limiter is
    /// only consulted (and advanced) while recording.
    pub fn try_begin_emit(&self, now: Instant) -> bool {
        self.is_recording() && self.limiter.should_emit(now)
    }

    pub fn attach_sink(&self, sink: Arc<dyn PointSink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    /// Detach the current sink, returning it.
    pub fn detach_sink(&self) -> Option<Arc<dyn PointSink>> {
        self.sink.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn sink(&self) -> Option<Arc<dyn PointSink>> {
        self.sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("recording", &self.recording_state())
            .field("epoch", &self.epoch())
            .field("limiter", &self.limiter)
            .field("sink_attached", &self.sink().is_some())
            .finish()
    }
}

/// Commands accepted on the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Enter `Recording`.
    Start,
    /// Enter `Idle`.
    Stop,
    /// Clear downstream state, enter `Idle`, restart tracking.
    Reset,
}

impl FromStr for ControlCommand {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "reset" => Ok(Self::Reset),
            other => Err(ControlError::Unimplemented(other.to_string())),
        }
    }
}

/// Errors surfaced to the control caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Method not implemented: {0}")]
    Unimplemented(String),
}

/// Applies control commands to a session. Cheap to clone and safe to use from
/// a different thread than the sensor callbacks.
#[derive(Clone)]
pub struct Controller {
    state: Arc<SessionState>,
    tracking: Arc<dyn TrackingControl>,
}

impl Controller {
    pub fn new(state: Arc<SessionState>, tracking: Arc<dyn TrackingControl>) -> Self {
        Self { state, tracking }
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Parse and apply a command by name. Unknown names leave the state untouched.
    #[tracing::instrument(skip(self))]
    pub fn dispatch(&self, method: &str) -> Result<(), ControlError> {
        let command = method.parse::<ControlCommand>().inspect_err(|e| {
            warn!("Rejected control command: {}", e);
        })?;
        self.apply(command);
        Ok(())
    }

    pub fn apply(&self, command: ControlCommand) {
        match command {
            ControlCommand::Start => {
                self.state.set_recording_state(RecordingState::Recording);
                info!("Recording started");
            }
            ControlCommand::Stop => {
                self.state.set_recording_state(RecordingState::Idle);
                info!("Recording stopped");
            }
            ControlCommand::Reset => self.reset(),
        }
    }

    fn reset(&self) {
        self.state.stop_and_clear();
        self.tracking.reset_tracking();
        info!("Session reset: recording stopped, tracking restarted");
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::SessionConfiguration;
    use crate::sink::SinkMessage;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingTracking {
        resets: AtomicUsize,
    }

    impl TrackingControl for CountingTracking {
        fn run(&self, _configuration: &SessionConfiguration) {}

        fn reset_tracking(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<SinkMessage>>,
    }

    impl PointSink for RecordingSink {
        fn push(&self, batch: PointBatch) {
            self.messages.lock().unwrap().push(SinkMessage::Batch(batch));
        }

        fn clear(&self) {
            self.messages.lock().unwrap().push(SinkMessage::Clear);
        }
    }

    fn controller() -> (Controller, Arc<CountingTracking>) {
        let tracking = Arc::new(CountingTracking::default());
        let state = Arc::new(SessionState::new(Duration::from_millis(100)));
        (Controller::new(state, tracking.clone()), tracking)
    }

    #[test]
    fn test_start_stop() {
        let (controller, _) = controller();
        assert_eq!(controller.state().recording_state(), RecordingState::Idle);
        controller.dispatch("start").unwrap();
        assert!(controller.state().is_recording());
        controller.dispatch("stop").unwrap();
        assert_eq!(controller.state().recording_state(), RecordingState::Idle);
    }

    #[test]
    fn test_reset_while_recording() {
        let (controller, tracking) = controller();
        let sink = Arc::new(RecordingSink::default());
        controller.state().attach_sink(sink.clone());

        controller.dispatch("start").unwrap();
        controller.dispatch("reset").unwrap();

        assert_eq!(controller.state().recording_state(), RecordingState::Idle);
        assert_eq!(tracking.resets.load(Ordering::SeqCst), 1);
        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], SinkMessage::Clear));
    }

    #[test]
    fn test_unknown_command() {
        let (controller, tracking) = controller();
        controller.dispatch("start").unwrap();

        let err = controller.dispatch("export").unwrap_err();
        assert_eq!(err, ControlError::Unimplemented("export".to_string()));
        assert!(controller.state().is_recording());
        assert_eq!(tracking.resets.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_gates() {
        let state = SessionState::new(Duration::from_millis(100));
        let t0 = Instant::now();
        // Idle: the limiter is not consulted, so it stays open.
        assert!(!state.try_begin_emit(t0));
        state.set_recording_state(RecordingState::Recording);
        assert!(state.try_begin_emit(t0));
        assert!(!state.try_begin_emit(t0 + Duration::from_millis(10)));
    }

    #[test]
    fn test_deliver_drops_batches_from_before_a_reset() {
        let (controller, _) = controller();
        let state = controller.state().clone();
        let sink = Arc::new(RecordingSink::default());
        state.attach_sink(sink.clone());
        controller.dispatch("start").unwrap();

        let epoch = state.epoch();
        controller.dispatch("reset").unwrap();
        controller.dispatch("start").unwrap();
        assert_eq!(state.deliver(epoch, vec![PointBatch::default()]), 0);

        let epoch = state.epoch();
        assert_eq!(state.deliver(epoch, vec![PointBatch::default()]), 1);
        let messages = sink.messages.lock().unwrap();
        assert!(matches!(messages.as_slice(), [SinkMessage::Clear, SinkMessage::Batch(_)]));
    }

    #[test]
    fn test_start_keeps_epoch() {
        let state = SessionState::new(Duration::from_millis(100));
        let epoch = state.epoch();
        state.set_recording_state(RecordingState::Recording);
        assert_eq!(state.epoch(), epoch);
        state.set_recording_state(RecordingState::Idle);
        assert_ne!(state.epoch(), epoch);
    }

    #[test]
    fn test_sink_attach_detach() {
        let state = SessionState::new(Duration::from_millis(100));
        assert!(state.sink().is_none());
        state.attach_sink(Arc::new(RecordingSink::default()));
        assert!(state.sink().is_some());
        assert!(state.detach_sink().is_some());
        assert!(state.sink().is_none());
    }
}
