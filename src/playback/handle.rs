// src/playback/handle.rs
// Runs a playback on its own thread so the caller stays free to cancel it
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, warn};

use crate::dataset::Dataset;
use crate::display::DisplaySink;
use crate::error::PlaybackError;
use crate::playback::engine::{Playback, PlaybackConfig, PlaybackReport, StatusCell};
use crate::types::{PlaybackCommand, PlaybackEvent, PlaybackStatus};

type WorkerResult<S> = (S, Result<PlaybackReport, PlaybackError>);

/// What a finished playback thread hands back. The sink is returned still
/// open so the caller decides when to close it.
pub struct PlaybackOutcome<S> {
    pub sink: Option<S>,
    pub result: Result<PlaybackReport, PlaybackError>,
}

impl<S: DisplaySink> PlaybackOutcome<S> {
    /// Closes the sink and returns it with the report.
    ///
    /// A playback error wins over a close error: a sink that already failed
    /// mid-session will often fail to close as well, and the batch index of
    /// the first failure is what the caller needs.
    pub fn finish(self) -> Result<(PlaybackReport, Option<S>), PlaybackError> {
        let mut sink = self.sink;
        let closed = match sink.as_mut() {
            Some(sink) => sink.close(),
            None => Ok(()),
        };
        match (self.result, closed) {
            (Err(err), Err(close_err)) => {
                warn!("display sink also failed to close: {close_err}");
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
            (Ok(_), Err(close_err)) => Err(PlaybackError::Close(close_err)),
            (Ok(report), Ok(())) => Ok((report, sink)),
        }
    }
}

/// Marks the playback failed when the worker unwinds, so `status()` does not
/// stay `Running` after a panic. Holds its own event sender so the event
/// channel only closes after `Finished(Failed)` went out.
struct FailOnUnwind {
    status: StatusCell,
    events: Sender<PlaybackEvent>,
}

impl Drop for FailOnUnwind {
    fn drop(&mut self) {
        if thread::panicking() && !self.status.get().is_terminal() {
            self.status.set(PlaybackStatus::Failed);
            self.events
                .send(PlaybackEvent::Finished(PlaybackStatus::Failed))
                .ok();
        }
    }
}

pub struct PlaybackHandle<S> {
    commands: Sender<PlaybackCommand>,
    events: Receiver<PlaybackEvent>,
    status: StatusCell,
    worker: Option<JoinHandle<WorkerResult<S>>>,
}

/// Starts replaying `dataset` into `sink` on a background thread.
pub fn start<S>(
    dataset: Arc<Dataset>,
    sink: S,
    config: PlaybackConfig,
) -> Result<PlaybackHandle<S>, PlaybackError>
where
    S: DisplaySink + Send + 'static,
{
    config.validate()?;
    let (tx_cmd, rx_cmd) = mpsc::channel::<PlaybackCommand>();
    let (tx_evt, rx_evt) = mpsc::channel::<PlaybackEvent>();
    let status = StatusCell::default();
    let worker_status = status.clone();

    let worker = thread::spawn(move || {
        let _guard = FailOnUnwind {
            status: worker_status.clone(),
            events: tx_evt.clone(),
        };
        let mut sink = sink;
        let result = Playback::new(&dataset, config).and_then(|playback| {
            playback
                .with_events(tx_evt)
                .with_status_cell(worker_status)
                .run(&mut sink, &rx_cmd)
        });
        (sink, result)
    });

    Ok(PlaybackHandle {
        commands: tx_cmd,
        events: rx_evt,
        status,
        worker: Some(worker),
    })
}

impl<S> PlaybackHandle<S> {
    /// Asks the playback to stop before its next batch. The batch being
    /// delivered right now, if any, still completes.
    pub fn cancel(&self) {
        if self.commands.send(PlaybackCommand::Cancel).is_err() {
            debug!("cancel ignored: playback already finished");
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status.get()
    }

    pub fn events(&self) -> &Receiver<PlaybackEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Blocks until the playback thread exits.
    pub fn join(mut self) -> PlaybackOutcome<S> {
        let Some(worker) = self.worker.take() else {
            return PlaybackOutcome {
                sink: None,
                result: Err(PlaybackError::WorkerPanicked),
            };
        };
        match worker.join() {
            Ok((sink, result)) => PlaybackOutcome {
                sink: Some(sink),
                result,
            },
            Err(_) => {
                error!("playback thread panicked");
                self.status.set(PlaybackStatus::Failed);
                PlaybackOutcome {
                    sink: None,
                    result: Err(PlaybackError::WorkerPanicked),
                }
            }
        }
    }
}

impl<S> Drop for PlaybackHandle<S> {
    fn drop(&mut self) {
        // dropping the handle cancels the playback
        if self.worker.is_some() {
            self.commands.send(PlaybackCommand::Cancel).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::pacing::PacingMode;
    use crate::playback::testing::{fixture, Call, ScriptedSink};
    use crate::types::SeriesChannel;
    use std::time::Duration;

    fn instant(batch_size: usize) -> PlaybackConfig {
        PlaybackConfig {
            batch_size,
            interval: Duration::ZERO,
            pacing: PacingMode::FixedDelay,
        }
    }

    #[test]
    fn background_playback_completes() {
        let dataset = Arc::new(fixture(10));
        let config = PlaybackConfig {
            batch_size: 3,
            interval: Duration::from_millis(1),
            pacing: PacingMode::Deadline,
        };
        let handle = start(dataset, ScriptedSink::default(), config).unwrap();
        let outcome = handle.join();
        let report = outcome.result.unwrap();
        assert_eq!(report.status, PlaybackStatus::Completed);
        assert_eq!(report.samples_delivered, 10);
        let sink = outcome.sink.unwrap();
        assert_eq!(sink.append_sizes(SeriesChannel::Ecg), vec![3, 3, 3, 1]);
    }

    #[test]
    fn cancel_from_caller_thread() {
        let dataset = Arc::new(fixture(200));
        let config = PlaybackConfig {
            batch_size: 1,
            interval: Duration::from_millis(20),
            pacing: PacingMode::FixedDelay,
        };
        let handle = start(dataset, ScriptedSink::default(), config).unwrap();
        let first_batch = handle
            .events()
            .iter()
            .find(|e| matches!(e, PlaybackEvent::Batch(_)));
        assert!(first_batch.is_some());
        handle.cancel();
        let outcome = handle.join();
        let report = outcome.result.unwrap();
        assert_eq!(report.status, PlaybackStatus::Cancelled);
        assert!(report.batches_delivered >= 1);
        assert!(report.batches_delivered < 200);
        let sink = outcome.sink.unwrap();
        assert_eq!(
            sink.append_sizes(SeriesChannel::Co2).len(),
            report.batches_delivered
        );
    }

    #[test]
    fn status_is_shared_with_worker() {
        let handle = start(
            Arc::new(fixture(4)),
            ScriptedSink::default(),
            PlaybackConfig {
                batch_size: 4,
                interval: Duration::ZERO,
                pacing: PacingMode::FixedDelay,
            },
        )
        .unwrap();
        let finished = handle
            .events()
            .iter()
            .find_map(|e| match e {
                PlaybackEvent::Finished(status) => Some(status),
                _ => None,
            });
        assert_eq!(finished, Some(PlaybackStatus::Completed));
        assert_eq!(handle.status(), PlaybackStatus::Completed);
        assert!(handle.join().result.is_ok());
    }

    struct PanickingSink;

    impl DisplaySink for PanickingSink {
        fn append_series(
            &mut self,
            _channel: SeriesChannel,
            _times: &[f64],
            _values: &[f64],
        ) -> Result<(), crate::error::SinkError> {
            panic!("renderer crashed");
        }

        fn set_gauge_value(
            &mut self,
            _gauge: crate::types::GaugeChannel,
            _value: f64,
        ) -> Result<(), crate::error::SinkError> {
            Ok(())
        }
    }

    #[test]
    fn panicking_worker_reports_failed_before_join() {
        let handle = start(Arc::new(fixture(3)), PanickingSink, instant(1)).unwrap();
        let finished = handle.events().iter().find_map(|e| match e {
            PlaybackEvent::Finished(status) => Some(status),
            _ => None,
        });
        assert_eq!(finished, Some(PlaybackStatus::Failed));
        assert_eq!(handle.status(), PlaybackStatus::Failed);
        let outcome = handle.join();
        assert!(outcome.sink.is_none());
        assert!(matches!(outcome.result, Err(PlaybackError::WorkerPanicked)));
    }

    #[test]
    fn finish_closes_sink_after_success() {
        let handle = start(Arc::new(fixture(4)), ScriptedSink::default(), instant(2)).unwrap();
        let (report, sink) = handle.join().finish().unwrap();
        assert_eq!(report.status, PlaybackStatus::Completed);
        assert_eq!(sink.unwrap().calls.last(), Some(&Call::Close));
    }

    #[test]
    fn finish_prefers_playback_error_over_close_error() {
        let sink = ScriptedSink {
            fail_on_append: Some((SeriesChannel::Art, 2)),
            fail_close: true,
            ..ScriptedSink::default()
        };
        let handle = start(Arc::new(fixture(6)), sink, instant(2)).unwrap();
        let err = handle.join().finish().unwrap_err();
        assert!(matches!(err, PlaybackError::Sink { batch_index: 1, .. }));
    }

    #[test]
    fn finish_reports_close_failure() {
        let sink = ScriptedSink {
            fail_close: true,
            ..ScriptedSink::default()
        };
        let handle = start(Arc::new(fixture(2)), sink, instant(1)).unwrap();
        let err = handle.join().finish().unwrap_err();
        assert!(matches!(err, PlaybackError::Close(_)));
        assert_eq!(err.batch_index(), None);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = PlaybackConfig {
            batch_size: 0,
            ..PlaybackConfig::per_sample()
        };
        assert!(matches!(
            start(Arc::new(fixture(3)), ScriptedSink::default(), config),
            Err(PlaybackError::InvalidBatchSize)
        ));
    }
}
