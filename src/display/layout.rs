use serde::Deserialize;

use crate::types::{GaugeChannel, SeriesChannel};

/// Samples retained per scrolling series before the oldest are dropped.
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;
/// Visible span of a scrolling series, in time-index ticks.
pub const DEFAULT_X_WINDOW: f64 = 600.0;

#[derive(Clone, Debug, PartialEq)]
pub struct SeriesPanel {
    pub channel: SeriesChannel,
    pub title: &'static str,
    /// Default Y interval (low, high).
    pub y_range: (f64, f64),
    pub x_window: f64,
    pub max_samples: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GaugePanel {
    pub channel: GaugeChannel,
    pub title: &'static str,
    pub range: (f64, f64),
}

impl GaugePanel {
    /// Position of `value` inside the gauge interval, clamped to 0..=1.
    pub fn fraction(&self, value: f64) -> f64 {
        let (low, high) = self.range;
        if high <= low {
            return 0.0;
        }
        ((value - low) / (high - low)).clamp(0.0, 1.0)
    }
}

/// Panel configuration for the bedside monitor: four scrolling waveforms and
/// two gauges.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardLayout {
    pub series: [SeriesPanel; 4],
    pub gauges: [GaugePanel; 2],
}

impl DashboardLayout {
    pub fn series_panel(&self, channel: SeriesChannel) -> &SeriesPanel {
        &self.series[channel.index()]
    }

    pub fn gauge_panel(&self, channel: GaugeChannel) -> &GaugePanel {
        &self.gauges[channel.index()]
    }

    pub fn with_overrides(mut self, overrides: &DisplayOverrides) -> Self {
        for panel in &mut self.series {
            if let Some(max) = overrides.max_samples {
                panel.max_samples = max.max(1);
            }
            if let Some(window) = overrides.x_window {
                panel.x_window = window;
            }
        }
        self
    }
}

impl Default for DashboardLayout {
    fn default() -> Self {
        let series_range = |channel: SeriesChannel| match channel {
            SeriesChannel::Ecg => (-0.5, 1.0),
            SeriesChannel::Pleth => (20.0, 60.0),
            SeriesChannel::Art => (50.0, 150.0),
            SeriesChannel::Co2 => (0.0, 50.0),
        };
        let gauge_range = |channel: GaugeChannel| match channel {
            GaugeChannel::Temperature => (25.0, 50.0),
            GaugeChannel::HeartRate => (40.0, 150.0),
        };
        Self {
            series: SeriesChannel::ALL.map(|channel| SeriesPanel {
                channel,
                title: channel.title(),
                y_range: series_range(channel),
                x_window: DEFAULT_X_WINDOW,
                max_samples: DEFAULT_MAX_SAMPLES,
            }),
            gauges: GaugeChannel::ALL.map(|channel| GaugePanel {
                channel,
                title: channel.title(),
                range: gauge_range(channel),
            }),
        }
    }
}

/// `[display]` section of the config file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct DisplayOverrides {
    pub max_samples: Option<usize>,
    pub x_window: Option<f64>,
}
