//! Replay of recorded bedside-monitor exports.
//!
//! A [`Dataset`] is loaded from a headerless CSV export (time, CO2, ART,
//! PLETH, ECG, temperature, heart rate) and replayed at a fixed rate by a
//! [`Playback`] into any [`DisplaySink`]: waveform channels are appended in
//! batches, the two gauges receive each recorded reading as it passes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vitalmon::{playback, Dataset, MonitorSink, PlaybackConfig};
//!
//! let dataset = Arc::new(Dataset::load("data/data_cut.csv")?);
//! let handle = playback::start(dataset, MonitorSink::default(), PlaybackConfig::batched())?;
//! let (report, _sink) = handle.join().finish()?;
//! println!("{:?}", report.status);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod dataset;
pub mod display;
pub mod error;
pub mod playback;
pub mod recorder;
pub mod synth;
pub mod types;

pub use dataset::{AbsentPolicy, ColumnLayout, Dataset, DatasetSummary, LoadOptions};
pub use display::{DashboardLayout, DisplaySink, MonitorSink, Tee};
pub use error::{LoadError, PlaybackError, PlotError, SinkError};
pub use playback::{PacingMode, Playback, PlaybackConfig, PlaybackHandle, PlaybackReport};
pub use recorder::RecordingSink;
pub use types::{
    ChannelId, GaugeChannel, PlaybackCommand, PlaybackEvent, PlaybackStatus, SeriesChannel,
};
