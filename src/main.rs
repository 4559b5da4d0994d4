// src/main.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};

use vitalmon::config::Config;
use vitalmon::display::{render_dashboard_png, PlotStyle};
use vitalmon::{
    playback, synth, DashboardLayout, Dataset, MonitorSink, PacingMode, PlaybackEvent,
    RecordingSink, Tee,
};

/// vitalmon - replay recorded vital-sign exports at a fixed rate
#[derive(Parser)]
#[command(name = "vitalmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an export into the in-memory monitor
    Play {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Samples delivered per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Seconds between batches
        #[arg(short, long)]
        interval: Option<f64>,

        #[arg(long, value_enum)]
        pacing: Option<PacingArg>,

        /// Also write every delivered sample to this CSV file
        #[arg(long, value_name = "CSV")]
        record: Option<PathBuf>,

        /// Save a PNG of the final dashboard
        #[arg(long, value_name = "PNG")]
        snapshot: Option<PathBuf>,

        /// Cancel the replay after this many seconds
        #[arg(long, value_name = "SECS")]
        stop_after: Option<f64>,
    },

    /// Print a JSON summary of an export
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a synthetic export
    Synth {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        #[arg(short, long, default_value = "30000")]
        rows: usize,

        #[arg(short, long, default_value = "0")]
        seed: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PacingArg {
    FixedDelay,
    Deadline,
}

impl From<PacingArg> for PacingMode {
    fn from(value: PacingArg) -> Self {
        match value {
            PacingArg::FixedDelay => PacingMode::FixedDelay,
            PacingArg::Deadline => PacingMode::Deadline,
        }
    }
}

struct PlayArgs {
    file: PathBuf,
    config: Option<PathBuf>,
    batch_size: Option<usize>,
    interval: Option<f64>,
    pacing: Option<PacingArg>,
    record: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    stop_after: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Play {
            file,
            config,
            batch_size,
            interval,
            pacing,
            record,
            snapshot,
            stop_after,
        } => run_play(PlayArgs {
            file,
            config,
            batch_size,
            interval,
            pacing,
            record,
            snapshot,
            stop_after,
        }),
        Commands::Info { file, config } => run_info(&file, config.as_deref()),
        Commands::Synth { output, rows, seed } => run_synth(&output, rows, seed),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn run_play(args: PlayArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.batch_size.is_some() {
        config.playback.batch_size = args.batch_size;
    }
    if args.interval.is_some() {
        config.playback.interval_seconds = args.interval;
    }
    if let Some(pacing) = args.pacing {
        config.playback.pacing = Some(pacing.into());
    }
    let stop_after = args
        .stop_after
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--stop-after must be a non-negative number of seconds")?;

    let playback_config = config.playback_config()?;
    let layout = DashboardLayout::default().with_overrides(&config.display_overrides()?);
    let dataset = Dataset::load_with(&args.file, &config.load_options()?)
        .with_context(|| format!("Failed to load dataset: {}", args.file.display()))?;

    let recorder = match &args.record {
        Some(path) => Some(
            RecordingSink::create(path)
                .with_context(|| format!("Failed to create recording: {}", path.display()))?,
        ),
        None => None,
    };
    let sink = Tee(MonitorSink::new(layout), recorder);

    let handle = playback::start(Arc::new(dataset), sink, playback_config)?;
    // a stop-after past what the clock can represent never fires
    let mut deadline = stop_after.and_then(|after| Instant::now().checked_add(after));
    loop {
        let timeout = deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(1));
        match handle.events().recv_timeout(timeout) {
            Ok(PlaybackEvent::Started {
                total_samples,
                total_batches,
            }) => info!("replaying {total_samples} samples in {total_batches} batches"),
            Ok(PlaybackEvent::Batch(progress)) => {
                debug!("batch {} done, cursor at {}", progress.index, progress.cursor)
            }
            Ok(PlaybackEvent::Finished(status)) => {
                info!("playback {status}");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    warn!("stop-after elapsed; cancelling playback");
                    handle.cancel();
                    deadline = None;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let (report, sink) = handle.join().finish().context("Playback failed")?;
    if let (Some(sink), Some(path)) = (sink, &args.snapshot) {
        let (monitor, _) = sink.into_inner();
        let png = render_dashboard_png(&monitor, &PlotStyle::default())
            .context("Failed to render dashboard snapshot")?;
        fs::write(path, png)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        info!("saved dashboard snapshot to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_info(file: &Path, config: Option<&Path>) -> Result<()> {
    if !file.exists() {
        bail!("File does not exist: {}", file.display());
    }
    let config = load_config(config)?;
    let dataset = Dataset::load_with(file, &config.load_options()?)
        .with_context(|| format!("Failed to load dataset: {}", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&dataset.summary())?);
    Ok(())
}

fn run_synth(output: &Path, rows: usize, seed: u64) -> Result<()> {
    let table = synth::generate(rows, seed);
    synth::write_csv(output, &table)
        .with_context(|| format!("Failed to write synthetic export: {}", output.display()))?;
    println!("Wrote {} rows to {}", rows, output.display());
    Ok(())
}
