//! Application configuration and the threaded run loop.
//!
//! Three threads share one fusion session:
//! - the sensor thread (the caller) pulls events from the device
//! - a control thread replays the start/stop/reset schedule
//! - a consumer thread accumulates the emitted batches

use crate::errors::AppError;
use crate::viewer::PointAccumulator;
use depthcloud_capture::{ReplayConfig, ReplayDevice};
use depthcloud_data::ColorFrame;
use depthcloud_fusion::color::decode_rgb_image;
use depthcloud_fusion::{
    ChannelSink, Controller, FusionSession, PipelineConfig, RangePreset, SensorFrameEvent,
    SensorStream,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
    pub enable_tracy: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_tracy: false,
        }
    }
}

impl LoggingConfig {
    /// Install the global subscriber. `RUST_LOG` wins over `level`.
    pub fn init(&self) {
        #[cfg(feature = "tracy")]
        {
            if self.enable_tracy {
                use tracing_subscriber::Layer;
                use tracing_subscriber::layer::SubscriberExt;
                use tracing_subscriber::util::SubscriberInitExt;
                tracing_subscriber::registry()
                    .with(tracing_tracy::TracyLayer::default())
                    .with(
                        tracing_subscriber::fmt::layer().with_filter(
                            tracing_subscriber::EnvFilter::try_from_default_env()
                                .unwrap_or_else(|_| self.level.clone().into()),
                        ),
                    )
                    .init();
                return;
            }
        }

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.level)),
            )
            .with_target(false)
            .init();
    }
}

/// Pipeline and device settings, loadable from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub device: ReplayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_preset(RangePreset::default())
    }
}

impl AppConfig {
    /// The replay device reports intrinsics at the color resolution, so the
    /// depth path rescales them by default.
    pub fn from_preset(preset: RangePreset) -> Self {
        Self {
            pipeline: PipelineConfig::preset(preset).with_rescaled_depth_intrinsics(true),
            device: ReplayConfig::default(),
        }
    }

    /// Load a JSON file whose fields override the preset's values.
    pub fn load(path: &Path, preset: RangePreset) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text, preset)
    }

    pub fn from_json(text: &str, preset: RangePreset) -> Result<Self, AppError> {
        let overrides: Value = serde_json::from_str(text)?;
        if !overrides.is_object() {
            return Err(AppError::Config("top level must be a JSON object".to_string()));
        }
        let mut merged = serde_json::to_value(Self::from_preset(preset))?;
        merge_json(&mut merged, overrides);
        Ok(serde_json::from_value(merged)?)
    }
}

/// Recursively overlay `overrides` onto `base`. Objects merge key by key;
/// anything else replaces.
fn merge_json(base: &mut Value, overrides: Value) {
    match (base.as_object_mut(), overrides) {
        (Some(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (_, value) => *base = value,
    }
}

/// Control commands to dispatch at offsets from the start of the run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSchedule {
    entries: Vec<(Duration, String)>,
}

impl CommandSchedule {
    /// Parse `"start@0,stop@1500,reset@2000"` (offsets in milliseconds).
    /// A bare command name runs at offset zero.
    pub fn parse(spec: &str) -> Result<Self, AppError> {
        let mut entries = Vec::new();
        for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (command, offset) = match item.split_once('@') {
                Some((command, millis)) => {
                    let millis = millis.trim().parse::<u64>().map_err(|e| {
                        AppError::Schedule(format!("bad offset in '{item}': {e}"))
                    })?;
                    (command.trim(), Duration::from_millis(millis))
                }
                None => (item, Duration::ZERO),
            };
            if command.is_empty() {
                return Err(AppError::Schedule(format!("missing command in '{item}'")));
            }
            entries.push((offset, command.to_string()));
        }
        entries.sort_by_key(|(offset, _)| *offset);
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(Duration, String)] {
        &self.entries
    }

    /// Dispatch each command at its offset from `start`. Returns early once
    /// `stop` fires or its sender is dropped.
    fn run(&self, controller: &Controller, start: Instant, stop: mpsc::Receiver<()>) -> usize {
        let mut dispatched = 0;
        for (offset, command) in &self.entries {
            let wait = (start + *offset).saturating_duration_since(Instant::now());
            match stop.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            // Unknown commands are reported and skipped.
            if let Err(e) = controller.dispatch(command) {
                warn!("Control command '{}' failed: {}", command, e);
            }
            dispatched += 1;
        }
        dispatched
    }
}

/// Everything `run` needs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: AppConfig,
    pub schedule: CommandSchedule,
    pub preview: Option<PathBuf>,
    pub dump: Option<PathBuf>,
}

/// What a run produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub commands: usize,
    pub batches: usize,
    pub points: usize,
    pub clears: usize,
}

/// Run the replay device through a fusion session until the stream ends.
#[tracing::instrument(skip(options))]
pub fn run(options: RunOptions) -> Result<RunSummary, AppError> {
    let RunOptions {
        config,
        schedule,
        preview,
        dump,
    } = options;

    let (mut device, control) = ReplayDevice::new(config.device)?;
    let (mut session, controller) =
        FusionSession::configure(config.pipeline, &device.capabilities(), control)
            .ok_or(AppError::Unsupported)?;

    let (sink, receiver) = ChannelSink::new();
    session.attach_sink(Arc::new(sink));

    let consumer = thread::Builder::new()
        .name("consumer".to_string())
        .spawn(move || PointAccumulator::drain(receiver))?;

    let (stop_control, stop_receiver) = mpsc::channel();
    let start = Instant::now();
    let control_thread = thread::Builder::new()
        .name("control".to_string())
        .spawn(move || schedule.run(&controller, start, stop_receiver))?;

    let mut preview_image = None;
    let sensor_result = loop {
        let step = device.next_event(&mut |event: SensorFrameEvent<'_>| {
            if preview.is_some() {
                if let Some(color) = event_color(&event) {
                    preview_image = Some(decode_rgb_image(&color));
                }
            }
            session.on_event(event);
        });
        match step {
            Ok(true) => {}
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    // Close the sink so the consumer drains and exits, then stop the schedule.
    session.detach_sink();
    drop(stop_control);
    let commands = control_thread
        .join()
        .map_err(|_| AppError::ThreadPanicked("control"))?;
    let accumulator = consumer
        .join()
        .map_err(|_| AppError::ThreadPanicked("consumer"))?;
    sensor_result?;
    let frames = device.frames_emitted();

    if let (Some(path), Some(image)) = (&preview, &preview_image) {
        image.save(path)?;
        info!("Saved color preview to {}", path.display());
    }
    if let Some(path) = &dump {
        accumulator.write_raw(path)?;
    }
    if let Some((min, max)) = accumulator.bounds() {
        info!("Point bounds: {:?} .. {:?}", min, max);
    }

    Ok(RunSummary {
        frames,
        commands,
        batches: accumulator.batches(),
        points: accumulator.points().len(),
        clears: accumulator.clears(),
    })
}

fn event_color<'a>(event: &SensorFrameEvent<'a>) -> Option<ColorFrame<'a>> {
    match event {
        SensorFrameEvent::DepthUpdate(update) => update.color,
        SensorFrameEvent::MeshAnchorUpdate(update) => update.color,
        SensorFrameEvent::PoseUpdate(_) => None,
    }
}
