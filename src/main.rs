//! shake: replay or simulate accelerometer streams through the detector.
//!
//! The sample source runs on its own thread and feeds a channel; the main
//! thread owns the detector and prints one JSON line per event on stdout.
//! Diagnostics go to stderr via tracing.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shake::config::{parse_flag, ShakeSettings};
use shake::sensor::{self, AccelerationSample, SyntheticShake};
use shake::{DetectorState, Sensitivity, ShakeDetector, ShakeEvent};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shake")]
#[command(about = "Sustained shake-gesture detector")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    opts: DetectorOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DetectorOpts {
    /// JSON settings file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured sensitivity (low, medium, high)
    #[arg(long, global = true)]
    sensitivity: Option<Sensitivity>,

    /// Log per-sample diagnostics
    #[arg(long, global = true)]
    debug: bool,

    /// Also print quarter-progress milestones
    #[arg(long, global = true)]
    progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay newline-delimited JSON samples from a file ("-" for stdin)
    Replay {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Generate a synthetic stream from still/shake segments
    Simulate {
        /// Comma-separated segments, e.g. still:300,shake:3300
        #[arg(long, default_value = "still:330,shake:3300,still:500")]
        pattern: String,

        /// Deliver samples at the sensor interval instead of all at once
        #[arg(long)]
        realtime: bool,
    },
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Output {
    Shake(ShakeEvent),
    Progress {
        quarter: u32,
        progress: f64,
        timestamp_ms: u64,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let settings = match load_settings(&cli.opts) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    let (tx, rx) = mpsc::channel();
    let source = match spawn_source(cli.command, settings.sample_interval_ms, tx) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "failed to start sample source");
            std::process::exit(1);
        }
    };

    let mut detector = match ShakeDetector::new(settings.detector.clone()) {
        Ok(detector) => detector,
        Err(e) => {
            tracing::error!(error = %e, "invalid detector configuration");
            std::process::exit(2);
        }
    };
    detector.set_feature_enabled(settings.feature_enabled);
    tracing::info!(
        sensitivity = detector.config().sensitivity.as_str(),
        threshold = detector.config().effective_threshold(),
        feature_enabled = detector.is_feature_enabled(),
        "detector ready"
    );
    if !detector.is_feature_enabled() {
        tracing::info!("shake to order is disabled; samples will be ignored");
    }

    let summary = run(&mut detector, rx, cli.opts.progress);

    match source.join() {
        Ok(Err(e)) => tracing::warn!(error = %e, "sample source stopped early"),
        Err(_) => tracing::warn!("sample source panicked"),
        Ok(Ok(())) => {}
    }

    tracing::info!(
        samples = summary.samples,
        shakes = summary.shakes,
        "stream finished"
    );
}

fn init_logging() {
    let debug_enabled = std::env::var("SHAKE_DEBUG_LOG")
        .ok()
        .and_then(|value| parse_flag(&value))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_settings(opts: &DetectorOpts) -> Result<ShakeSettings, shake::ConfigError> {
    let mut settings = match &opts.config {
        Some(path) => ShakeSettings::load(path)?,
        None => ShakeSettings::default(),
    };
    settings.apply_env();
    if let Some(sensitivity) = opts.sensitivity {
        settings.detector.sensitivity = sensitivity;
    }
    if opts.debug {
        settings.detector.debug = true;
    }
    settings.validate()?;
    Ok(settings)
}

fn spawn_source(
    command: Commands,
    interval_ms: u64,
    tx: mpsc::Sender<AccelerationSample>,
) -> Result<thread::JoinHandle<Result<(), shake::SensorError>>, shake::SensorError> {
    match command {
        Commands::Replay { path } => {
            let reader: Box<dyn io::BufRead + Send> = if path.as_os_str() == "-" {
                Box::new(BufReader::new(io::stdin()))
            } else {
                Box::new(BufReader::new(File::open(&path)?))
            };
            Ok(thread::spawn(move || {
                let summary = sensor::replay(reader, tx)?;
                if summary.skipped > 0 {
                    tracing::warn!(skipped = summary.skipped, "some recorded lines were unusable");
                }
                Ok(())
            }))
        }
        Commands::Simulate { pattern, realtime } => {
            let segments = sensor::parse_pattern(&pattern)?;
            let samples = SyntheticShake::new(interval_ms, segments).samples();
            let pace = realtime.then(|| Duration::from_millis(interval_ms));
            Ok(thread::spawn(move || {
                sensor::stream(samples, tx, pace);
                Ok(())
            }))
        }
    }
}

struct RunSummary {
    samples: u64,
    shakes: u64,
}

fn run(
    detector: &mut ShakeDetector,
    rx: mpsc::Receiver<AccelerationSample>,
    show_progress: bool,
) -> RunSummary {
    let mut summary = RunSummary {
        samples: 0,
        shakes: 0,
    };
    let mut milestones = Milestones::default();

    while let Ok(sample) = rx.recv() {
        summary.samples += 1;
        if let Some(event) = detector.on_sample(&sample) {
            summary.shakes += 1;
            milestones.reset();
            emit(&Output::Shake(event));
            continue;
        }
        if show_progress {
            if let Some(quarter) = milestones.crossed(&detector.state()) {
                emit(&Output::Progress {
                    quarter,
                    progress: detector.state().sustained_progress,
                    timestamp_ms: sample.timestamp_ms,
                });
            }
        }
    }

    summary
}

fn emit(output: &Output) {
    match serde_json::to_string(output) {
        Ok(json) => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").ok();
            stdout.flush().ok();
        }
        Err(e) => tracing::warn!(error = %e, "failed to encode event"),
    }
}

/// Quarter marks reached by the current session, the cue for haptic ticks.
#[derive(Default)]
struct Milestones {
    reached: u32,
}

impl Milestones {
    fn crossed(&mut self, state: &DetectorState) -> Option<u32> {
        if !state.is_sustained_shaking {
            self.reset();
            return None;
        }
        let quarter = (state.sustained_progress * 4.0).floor() as u32;
        if quarter > self.reached {
            self.reached = quarter;
            Some(quarter)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.reached = 0;
    }
}
