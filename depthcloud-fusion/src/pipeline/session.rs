//! A configured fusion session: builder, shared state and sink delivery.

use super::builder::PointCloudBuilder;
use super::config::PipelineConfig;
use crate::control::{Controller, SessionState};
use crate::ingest::{
    Capabilities, GenerationMode, SensorFrameEvent, SensorStream, SessionConfiguration,
    StreamError, TrackingControl,
};
use crate::sink::PointSink;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Owns the builder on the sensor thread. Control commands reach it through a
/// [`Controller`] sharing the same [`SessionState`].
#[derive(Debug)]
pub struct FusionSession {
    builder: PointCloudBuilder,
}

impl FusionSession {
    pub fn new(config: PipelineConfig, mode: GenerationMode) -> Self {
        let state = Arc::new(SessionState::new(config.emit_interval()));
        Self {
            builder: PointCloudBuilder::new(config, mode, state),
        }
    }

    /// Configure the tracking layer from the device capabilities, start it,
    /// and build a session in the matching generation mode.
    ///
    /// Returns `None` (after logging) when the device supports neither world
    /// tracking nor any point source; tracking is not started in that case.
    #[tracing::instrument(skip(config, tracking))]
    pub fn configure(
        config: PipelineConfig,
        capabilities: &Capabilities,
        tracking: Arc<dyn TrackingControl>,
    ) -> Option<(Self, Controller)> {
        let configuration = SessionConfiguration::from_capabilities(capabilities)?;
        let mode = configuration.generation_mode()?;

        tracking.run(&configuration);
        let session = Self::new(config, mode);
        let controller = session.controller(tracking);
        info!(
            "Fusion session running: {:?}, max range {} m",
            mode, config.max_range
        );
        Some((session, controller))
    }

    pub fn controller(&self, tracking: Arc<dyn TrackingControl>) -> Controller {
        Controller::new(self.state().clone(), tracking)
    }

    pub fn state(&self) -> &Arc<SessionState> {
        self.builder.state()
    }

    pub fn builder(&self) -> &PointCloudBuilder {
        &self.builder
    }

    pub fn mode(&self) -> GenerationMode {
        self.builder.mode()
    }

    pub fn attach_sink(&self, sink: Arc<dyn PointSink>) {
        self.state().attach_sink(sink);
        info!("Point sink attached");
    }

    pub fn detach_sink(&self) -> Option<Arc<dyn PointSink>> {
        let sink = self.state().detach_sink();
        if sink.is_some() {
            info!("Point sink detached");
        }
        sink
    }

    /// Handle one sensor callback. Returns the number of batches pushed.
    pub fn on_event(&mut self, event: SensorFrameEvent<'_>) -> usize {
        self.on_event_at(event, Instant::now())
    }

    pub fn on_event_at(&mut self, event: SensorFrameEvent<'_>, now: Instant) -> usize {
        let epoch = self.state().epoch();
        let batches = self.builder.handle_event(event, now);
        if batches.is_empty() {
            return 0;
        }
        self.state().deliver(epoch, batches)
    }

    /// Pull one event from `stream` and handle it. Returns `Ok(false)` when
    /// the stream has ended.
    pub fn drive<S: SensorStream + ?Sized>(&mut self, stream: &mut S) -> Result<bool, StreamError> {
        stream.next_event(&mut |event: SensorFrameEvent<'_>| {
            self.on_event(event);
        })
    }
}
