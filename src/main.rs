//! `subject-pose` binary: replay recorded detector and pose output through
//! the subject tracking pipeline and write `keypoints.npy`.
//!
//! # Usage
//!
//! ```bash
//! subject-pose --recording run.jsonl
//! subject-pose --config subject-pose.toml --recording run.jsonl --output-dir out/
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use subject_pose_rs::{FramePipeline, NpyFileSink, PipelineConfig, Recording};

#[derive(Parser, Debug)]
#[command(
    name = "subject-pose",
    version,
    about = "Track one person through a video and record their keypoints",
    long_about = None
)]
struct Args {
    /// Path to the TOML configuration file.
    ///
    /// If not provided, the defaults are used.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON-lines file of recorded detector and pose output, one line per frame.
    #[arg(short, long, value_name = "FILE")]
    recording: PathBuf,

    /// Override the output directory from the config.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Override the detection score threshold.
    #[arg(long)]
    threshold: Option<f32>,

    /// Override how many frames a lost person is kept alive.
    #[arg(long)]
    max_age: Option<u32>,

    /// Run without writing the keypoint file.
    #[arg(long, default_value_t = false)]
    no_save: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .init();

    let mut config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if let Some(threshold) = args.threshold {
        config.detection.threshold = threshold;
    }
    if let Some(max_age) = args.max_age {
        config.tracker.max_age = max_age;
    }
    if args.no_save {
        config.output.save = false;
    }
    config.validate().context("invalid configuration")?;

    let recording = Recording::from_jsonl(&args.recording)
        .with_context(|| format!("failed to read recording {}", args.recording.display()))?;
    info!("Replaying {} frames from {}", recording.len(), args.recording.display());

    let (source, detector, pose) = recording.into_replay();
    let mut pipeline = FramePipeline::from_config(detector, pose, &config);
    pipeline.run(source).context("pipeline run failed")?;

    if config.output.save {
        let path = config.output_path();
        pipeline
            .save(NpyFileSink::new(&path))
            .with_context(|| format!("failed to save keypoints to {}", path.display()))?;
        info!("Keypoints saved to {}", path.display());
    }

    Ok(())
}
