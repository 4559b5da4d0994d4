// src/types.rs
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// Column identifiers, including the shared time index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    Time,
    Co2,
    Art,
    Pleth,
    Ecg,
    Temperature,
    HeartRate,
}

impl ChannelId {
    /// Default column order of the recorded monitor export.
    pub const DEFAULT_LAYOUT: [ChannelId; 7] = [
        ChannelId::Time,
        ChannelId::Co2,
        ChannelId::Art,
        ChannelId::Pleth,
        ChannelId::Ecg,
        ChannelId::Temperature,
        ChannelId::HeartRate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ChannelId::Time => "time",
            ChannelId::Co2 => "co2",
            ChannelId::Art => "art",
            ChannelId::Pleth => "pleth",
            ChannelId::Ecg => "ecg",
            ChannelId::Temperature => "temperature",
            ChannelId::HeartRate => "heart_rate",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::DEFAULT_LAYOUT
            .into_iter()
            .find(|id| id.key().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// Continuously scrolling channels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesChannel {
    Ecg,
    Pleth,
    Art,
    Co2,
}

impl SeriesChannel {
    pub const ALL: [SeriesChannel; 4] = [
        SeriesChannel::Ecg,
        SeriesChannel::Pleth,
        SeriesChannel::Art,
        SeriesChannel::Co2,
    ];

    pub fn channel_id(self) -> ChannelId {
        match self {
            SeriesChannel::Ecg => ChannelId::Ecg,
            SeriesChannel::Pleth => ChannelId::Pleth,
            SeriesChannel::Art => ChannelId::Art,
            SeriesChannel::Co2 => ChannelId::Co2,
        }
    }

    pub fn from_channel_id(id: ChannelId) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.channel_id() == id)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn title(self) -> &'static str {
        match self {
            SeriesChannel::Ecg => "ECG",
            SeriesChannel::Pleth => "PLETH",
            SeriesChannel::Art => "ART",
            SeriesChannel::Co2 => "CO2",
        }
    }
}

impl fmt::Display for SeriesChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel_id().key())
    }
}

// Channels shown as a single current value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaugeChannel {
    Temperature,
    HeartRate,
}

impl GaugeChannel {
    pub const ALL: [GaugeChannel; 2] = [GaugeChannel::Temperature, GaugeChannel::HeartRate];

    pub fn channel_id(self) -> ChannelId {
        match self {
            GaugeChannel::Temperature => ChannelId::Temperature,
            GaugeChannel::HeartRate => ChannelId::HeartRate,
        }
    }

    pub fn from_channel_id(id: ChannelId) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.channel_id() == id)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn title(self) -> &'static str {
        match self {
            GaugeChannel::Temperature => "TEMP",
            GaugeChannel::HeartRate => "Heartrate",
        }
    }
}

impl fmt::Display for GaugeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel_id().key())
    }
}

// Idle -> Running -> {Completed, Cancelled, Failed}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl PlaybackStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PlaybackStatus::Completed | PlaybackStatus::Cancelled | PlaybackStatus::Failed
        )
    }

    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PlaybackStatus::Running,
            2 => PlaybackStatus::Completed,
            3 => PlaybackStatus::Cancelled,
            4 => PlaybackStatus::Failed,
            _ => PlaybackStatus::Idle,
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Running => "running",
            PlaybackStatus::Completed => "completed",
            PlaybackStatus::Cancelled => "cancelled",
            PlaybackStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

// Caller -> engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackCommand {
    Cancel,
}

// Engine -> caller
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    Started {
        total_samples: usize,
        total_batches: usize,
    },
    Batch(BatchProgress),
    Finished(PlaybackStatus),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchProgress {
    pub index: usize,
    /// Cursor position after the batch, i.e. samples consumed so far.
    pub cursor: usize,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_keys_round_trip() {
        for id in ChannelId::DEFAULT_LAYOUT {
            assert_eq!(ChannelId::from_key(id.key()), Some(id));
        }
        assert_eq!(ChannelId::from_key(" ECG "), Some(ChannelId::Ecg));
        assert_eq!(ChannelId::from_key("spo2"), None);
    }

    #[test]
    fn status_survives_atomic_encoding() {
        for status in [
            PlaybackStatus::Idle,
            PlaybackStatus::Running,
            PlaybackStatus::Completed,
            PlaybackStatus::Cancelled,
            PlaybackStatus::Failed,
        ] {
            assert_eq!(PlaybackStatus::from_u8(status.to_u8()), status);
        }
        assert!(!PlaybackStatus::Running.is_terminal());
        assert!(PlaybackStatus::Cancelled.is_terminal());
    }
}
