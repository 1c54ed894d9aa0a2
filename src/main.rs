use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use flate2::read::GzDecoder;
use joint_tracker_rs::{
    process_recording, FilterConfig, FrameReport, JointSummary, KinematicsFusion, RecordingReport,
    SensorFrame,
};
use serde::{Deserialize, Serialize};

/// Replay a recorded session through the joint tracking pipeline.
#[derive(Parser, Debug)]
#[command(name = "joint_tracker", version)]
struct Args {
    /// Recording to replay (*.json or *.json.gz)
    #[arg(long)]
    input: PathBuf,

    /// Filter configuration JSON (missing fields take defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override nominal sample interval [s]
    #[arg(long)]
    dt: Option<f64>,

    /// Override velocity high-pass coefficient
    #[arg(long)]
    alpha: Option<f64>,

    /// Override acceleration low-pass coefficient
    #[arg(long)]
    beta: Option<f64>,

    /// Emit joint angles on a uniform grid with this spacing [s]
    #[arg(long)]
    resample: Option<f64>,

    /// Output file (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordingFile {
    Wrapped { frames: Vec<SensorFrame> },
    Bare(Vec<SensorFrame>),
}

impl RecordingFile {
    fn into_frames(self) -> Vec<SensorFrame> {
        match self {
            RecordingFile::Wrapped { frames } | RecordingFile::Bare(frames) => frames,
        }
    }
}

#[derive(Serialize)]
struct ReplayOutput {
    generated_at: String,
    input: String,
    config: FilterConfig,
    frames: Vec<FrameReport>,
    #[serde(flatten)]
    recording: RecordingReport,
}

fn load_recording(path: &Path) -> Result<Vec<SensorFrame>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let recording: RecordingFile = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let reader = BufReader::new(GzDecoder::new(file));
        serde_json::from_reader(reader)
    } else {
        serde_json::from_reader(BufReader::new(file))
    }
    .with_context(|| format!("parsing recording {}", path.display()))?;
    Ok(recording.into_frames())
}

fn build_config(args: &Args) -> Result<FilterConfig> {
    let mut config = match &args.config {
        Some(path) => FilterConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FilterConfig::default(),
    };
    if let Some(dt) = args.dt {
        config.dt = dt;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(beta) = args.beta {
        config.beta = beta;
    }
    config.validate()?;
    Ok(config)
}

fn log_summary(summary: &JointSummary) {
    for (name, s) in [
        ("left knee", &summary.left_knee),
        ("right knee", &summary.right_knee),
        ("left hip", &summary.left_hip),
        ("right hip", &summary.right_hip),
    ] {
        match (s.min, s.max, s.mean) {
            (Some(min), Some(max), Some(mean)) => log::info!(
                "{name:>10}: {} readings, min {min:.1}°, max {max:.1}°, mean {mean:.1}°",
                s.count
            ),
            _ => log::info!("{name:>10}: no readings"),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let frames = load_recording(&args.input)?;
    log::info!(
        "Replaying {} frames from {} (dt={}s, alpha={}, beta={})",
        frames.len(),
        args.input.display(),
        config.dt,
        config.alpha,
        config.beta
    );

    let mut fusion = KinematicsFusion::new(config.clone())?;
    let reports: Vec<FrameReport> = frames
        .iter()
        .map(|f| {
            let mut report = fusion.process_frame(f);
            report.joints = report.joints.rounded();
            report
        })
        .collect();

    let recording = process_recording(&frames, &config, args.resample)?;
    log_summary(&recording.summary);

    let output = ReplayOutput {
        generated_at: Utc::now().to_rfc3339(),
        input: args.input.display().to_string(),
        config,
        frames: reports,
        recording,
    };

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, &output)?;
    } else {
        serde_json::to_writer(&mut writer, &output)?;
    }
    writeln!(writer)?;
    writer.flush()?;

    if let Some(path) = &args.output {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}
