//! Depthcloud Application
//!
//! Replays a synthetic depth device through the fusion pipeline.
//!
//! Features:
//! - Range presets and JSON configuration overrides
//! - Scheduled start/stop/reset commands on a control thread
//! - Optional color preview and raw point dump

mod app;
mod errors;
mod viewer;

use app::{AppConfig, CommandSchedule, LoggingConfig, RunOptions};
use clap::Parser;
use depthcloud_fusion::RangePreset;
use depthcloud_fusion::ingest::Capabilities;
use errors::AppError;
use std::path::PathBuf;
use tracing::info;

/// Depthcloud - Live Depth-to-Point-Cloud Fusion
#[derive(Parser, Debug)]
#[command(name = "depthcloud")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Range preset (high-confidence, coarse)
    #[arg(short, long, default_value = "high-confidence")]
    preset: String,

    /// JSON file overriding pipeline and device settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to replay
    #[arg(short, long)]
    frames: Option<u64>,

    /// Pretend the device has no scene reconstruction
    #[arg(long)]
    no_mesh: bool,

    /// Replay as fast as possible instead of at the device frame rate
    #[arg(long)]
    no_realtime: bool,

    /// Control commands as `name@millis`, comma separated
    #[arg(long, default_value = "start@0")]
    commands: String,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Send spans to Tracy (requires the `tracy` feature)
    #[arg(long)]
    tracy: bool,

    /// Save the last color frame as an image
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Write accumulated points as raw little-endian floats
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn build_options(args: Args) -> Result<RunOptions, AppError> {
    let preset: RangePreset = args.preset.parse().map_err(AppError::Config)?;
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path, preset)?,
        None => AppConfig::from_preset(preset),
    };
    if let Some(frames) = args.frames {
        config.device.frames = frames;
    }
    if args.no_mesh {
        config.device.capabilities = Capabilities::depth_only();
    }
    if args.no_realtime {
        config.device.realtime = false;
    }

    Ok(RunOptions {
        config,
        schedule: CommandSchedule::parse(&args.commands)?,
        preview: args.preview,
        dump: args.dump,
    })
}

fn main() {
    let args = Args::parse();

    LoggingConfig {
        level: args.log_level.clone(),
        enable_tracy: args.tracy,
    }
    .init();

    info!("Starting depthcloud with preset {}", args.preset);

    let result = build_options(args).and_then(app::run);
    match result {
        Ok(summary) => info!(
            "Replayed {} frames: {} commands, {} batches, {} points, {} resets",
            summary.frames, summary.commands, summary.batches, summary.points, summary.clears
        ),
        Err(e) => {
            eprintln!("Application error: {}", e);
            std::process::exit(1);
        }
    }
}
