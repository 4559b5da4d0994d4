// src/playback/mod.rs
// Fixed-rate replay of a loaded dataset into a display sink
pub mod cursor;
pub mod engine;
pub mod handle;
pub mod pacing;

pub use cursor::{batch_count, Batch, PlaybackCursor};
pub use engine::{Playback, PlaybackConfig, PlaybackReport, StatusCell};
pub use handle::{start, PlaybackHandle, PlaybackOutcome};
pub use pacing::{Pacer, PacingMode};

#[cfg(test)]
pub(crate) mod testing {
    use std::fmt::Write as _;
    use std::sync::mpsc::Sender;

    use crate::dataset::{Dataset, LoadOptions};
    use crate::display::DisplaySink;
    use crate::error::SinkError;
    use crate::types::{GaugeChannel, PlaybackCommand, SeriesChannel};

    /// `len` rows in the default layout. Temperature is recorded on every
    /// fourth row starting at row 1, heart rate on every fifth starting at 0.
    pub fn fixture(len: usize) -> Dataset {
        let mut text = String::new();
        for i in 0..len {
            let t = i as f64 * 0.01;
            let temp = if i % 4 == 1 { format!("{}", 36.5 + i as f64 * 0.1) } else { String::new() };
            let hr = if i % 5 == 0 { format!("{}", 60 + i) } else { String::new() };
            writeln!(
                text,
                "{t},{co2},{art},{pleth},{ecg},{temp},{hr}",
                co2 = i * 2,
                art = 80 + i,
                pleth = 40 + i,
                ecg = i as f64 * 0.01 - 0.2,
            )
            .ok();
        }
        Dataset::from_reader(text.as_bytes(), &LoadOptions::default())
            .expect("fixture is well formed")
    }

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        Open,
        Append {
            channel: SeriesChannel,
            times: Vec<f64>,
            values: Vec<f64>,
        },
        Gauge {
            gauge: GaugeChannel,
            value: f64,
        },
        Close,
    }

    /// Records every call. Can be told to fail opening or closing, to fail
    /// the n-th append to a channel or the n-th update of a gauge, or to send
    /// a cancel during the n-th append.
    #[derive(Debug, Default)]
    pub struct ScriptedSink {
        pub calls: Vec<Call>,
        pub fail_open: bool,
        pub fail_close: bool,
        pub fail_on_append: Option<(SeriesChannel, usize)>,
        pub fail_on_gauge: Option<(GaugeChannel, usize)>,
        pub cancel_on_append: Option<(SeriesChannel, usize, Sender<PlaybackCommand>)>,
        pub appends: [usize; 4],
        pub gauge_updates: [usize; 2],
    }

    impl ScriptedSink {
        pub fn append_sizes(&self, channel: SeriesChannel) -> Vec<usize> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Append { channel: ch, times, .. } if *ch == channel => Some(times.len()),
                    _ => None,
                })
                .collect()
        }

        pub fn series_pairs(&self, channel: SeriesChannel) -> Vec<(f64, f64)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Append { channel: ch, times, values } if *ch == channel => {
                        Some(times.iter().copied().zip(values.iter().copied()))
                    }
                    _ => None,
                })
                .flatten()
                .collect()
        }

        pub fn gauge_values(&self, gauge: GaugeChannel) -> Vec<f64> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Gauge { gauge: g, value } if *g == gauge => Some(*value),
                    _ => None,
                })
                .collect()
        }
    }

    impl DisplaySink for ScriptedSink {
        fn open(&mut self) -> Result<(), SinkError> {
            if self.fail_open {
                return Err(SinkError::Rejected("open refused".into()));
            }
            self.calls.push(Call::Open);
            Ok(())
        }

        fn append_series(
            &mut self,
            channel: SeriesChannel,
            times: &[f64],
            values: &[f64],
        ) -> Result<(), SinkError> {
            self.appends[channel.index()] += 1;
            let nth = self.appends[channel.index()];
            if self.fail_on_append == Some((channel, nth)) {
                return Err(SinkError::Rejected(format!("append {nth} to {channel}")));
            }
            if let Some((target, at, tx)) = &self.cancel_on_append {
                if *target == channel && *at == nth {
                    tx.send(PlaybackCommand::Cancel).ok();
                }
            }
            self.calls.push(Call::Append {
                channel,
                times: times.to_vec(),
                values: values.to_vec(),
            });
            Ok(())
        }

        fn set_gauge_value(&mut self, gauge: GaugeChannel, value: f64) -> Result<(), SinkError> {
            self.gauge_updates[gauge.index()] += 1;
            let nth = self.gauge_updates[gauge.index()];
            if self.fail_on_gauge == Some((gauge, nth)) {
                return Err(SinkError::Rejected(format!("update {nth} of {gauge}")));
            }
            self.calls.push(Call::Gauge { gauge, value });
            Ok(())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            self.calls.push(Call::Close);
            if self.fail_close {
                return Err(SinkError::Rejected("close refused".into()));
            }
            Ok(())
        }
    }
}
