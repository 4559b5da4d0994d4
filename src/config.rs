//! TOML configuration file.
//!
//! Every key is optional; anything left out falls back to the built-in
//! defaults, and command-line flags override the file.
//!
//! ```toml
//! # vitalmon.toml
//! [dataset]
//! columns = ["time", "co2", "art", "pleth", "ecg", "temperature", "heart_rate"]
//! absent_policy = "zero-or-blank"
//!
//! [playback]
//! batch_size = 5
//! interval_seconds = 0.01
//! pacing = "fixed-delay"
//!
//! [display]
//! max_samples = 10000
//! x_window = 600.0
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::dataset::{AbsentPolicy, ColumnLayout, LoadOptions};
use crate::display::DisplayOverrides;
use crate::playback::{PacingMode, PlaybackConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetSection,
    #[serde(default)]
    pub playback: PlaybackSection,
    #[serde(default)]
    pub display: DisplayOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSection {
    /// Channel keys in file column order.
    pub columns: Option<Vec<String>>,
    pub absent_policy: Option<AbsentPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybackSection {
    pub batch_size: Option<usize>,
    pub interval_seconds: Option<f64>,
    pub pacing: Option<PacingMode>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    pub fn load_options(&self) -> Result<LoadOptions> {
        let layout = match &self.dataset.columns {
            Some(keys) => ColumnLayout::from_keys(keys).context("Invalid [dataset] columns")?,
            None => ColumnLayout::default(),
        };
        Ok(LoadOptions {
            layout,
            absent_policy: self.dataset.absent_policy.unwrap_or_default(),
        })
    }

    pub fn playback_config(&self) -> Result<PlaybackConfig> {
        let defaults = PlaybackConfig::default();
        let section = &self.playback;
        let batch_size = section.batch_size.unwrap_or(defaults.batch_size);
        if batch_size == 0 {
            bail!("[playback] batch_size must be at least 1");
        }
        let interval = match section.interval_seconds {
            Some(secs) => Duration::try_from_secs_f64(secs).with_context(|| {
                format!("[playback] interval_seconds must be finite and non-negative, got {secs}")
            })?,
            None => defaults.interval,
        };
        Ok(PlaybackConfig {
            batch_size,
            interval,
            pacing: section.pacing.unwrap_or(defaults.pacing),
        })
    }

    pub fn display_overrides(&self) -> Result<DisplayOverrides> {
        if let Some(window) = self.display.x_window {
            if !(window.is_finite() && window > 0.0) {
                bail!("[display] x_window must be a positive number, got {window}");
            }
        }
        Ok(self.display.clone())
    }
}
