// src/playback/engine.rs
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::dataset::Dataset;
use crate::display::DisplaySink;
use crate::error::{PlaybackError, SinkError};
use crate::playback::cursor::{Batch, PlaybackCursor};
use crate::playback::pacing::{Pacer, PacingMode};
use crate::types::{
    BatchProgress, GaugeChannel, PlaybackCommand, PlaybackEvent, PlaybackStatus, SeriesChannel,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackConfig {
    pub batch_size: usize,
    pub interval: Duration,
    pub pacing: PacingMode,
}

impl PlaybackConfig {
    /// Five samples per batch, 10 ms apart.
    pub fn batched() -> Self {
        Self {
            batch_size: 5,
            interval: Duration::from_millis(10),
            pacing: PacingMode::FixedDelay,
        }
    }

    /// One sample per batch, 10 ms apart.
    pub fn per_sample() -> Self {
        Self {
            batch_size: 1,
            ..Self::batched()
        }
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.batch_size == 0 {
            return Err(PlaybackError::InvalidBatchSize);
        }
        Ok(())
    }

    /// Samples per second if batches took no time to deliver.
    pub fn nominal_rate(&self) -> Option<f64> {
        let secs = self.interval.as_secs_f64();
        (secs > 0.0).then(|| self.batch_size as f64 / secs)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::batched()
    }
}

/// Shared view of a playback's state, readable from other threads.
#[derive(Clone, Debug, Default)]
pub struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    pub fn get(&self) -> PlaybackStatus {
        PlaybackStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: PlaybackStatus) {
        self.0.store(status.to_u8(), Ordering::Release);
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlaybackReport {
    pub status: PlaybackStatus,
    pub batches_delivered: usize,
    pub samples_delivered: usize,
    pub total_samples: usize,
    pub temperature_updates: u64,
    pub heart_rate_updates: u64,
    pub elapsed_seconds: f64,
    pub nominal_rate: Option<f64>,
}

impl PlaybackReport {
    pub fn gauge_updates(&self, gauge: GaugeChannel) -> u64 {
        match gauge {
            GaugeChannel::Temperature => self.temperature_updates,
            GaugeChannel::HeartRate => self.heart_rate_updates,
        }
    }

    /// Achieved samples per second, processing overhead included.
    pub fn effective_rate(&self) -> Option<f64> {
        (self.elapsed_seconds > 0.0).then(|| self.samples_delivered as f64 / self.elapsed_seconds)
    }
}

/// Replays a dataset into a display sink, one batch at a time.
///
/// A `Playback` runs once. After it reaches a terminal state it must be
/// `reset` before `run` is accepted again.
pub struct Playback<'a> {
    dataset: &'a Dataset,
    config: PlaybackConfig,
    cursor: PlaybackCursor,
    status: StatusCell,
    events: Option<Sender<PlaybackEvent>>,
    gauge_updates: [u64; 2],
}

impl<'a> Playback<'a> {
    pub fn new(dataset: &'a Dataset, config: PlaybackConfig) -> Result<Self, PlaybackError> {
        config.validate()?;
        Ok(Self {
            dataset,
            config,
            cursor: PlaybackCursor::new(dataset.len(), config.batch_size)?,
            status: StatusCell::default(),
            events: None,
            gauge_updates: [0; 2],
        })
    }

    /// Publishes progress events on `events` while running.
    pub fn with_events(mut self, events: Sender<PlaybackEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub(crate) fn with_status_cell(mut self, status: StatusCell) -> Self {
        status.set(self.status.get());
        self.status = status;
        self
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status.get()
    }

    pub fn status_cell(&self) -> StatusCell {
        self.status.clone()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
        self.gauge_updates = [0; 2];
        self.status.set(PlaybackStatus::Idle);
    }

    /// Opens `sink` and replays the whole dataset into it, checking
    /// `commands` for a cancel request between batches.
    ///
    /// Returns a report for `Completed` and `Cancelled` runs. A sink failure
    /// aborts the run immediately and is returned with the failing batch
    /// index; the sink is left open either way so the caller can close it.
    pub fn run<S: DisplaySink>(
        &mut self,
        sink: &mut S,
        commands: &Receiver<PlaybackCommand>,
    ) -> Result<PlaybackReport, PlaybackError> {
        let current = self.status();
        if current != PlaybackStatus::Idle {
            return Err(PlaybackError::NotIdle(current));
        }
        let started = Instant::now();
        self.status.set(PlaybackStatus::Running);
        info!(
            "playback started: {} samples, batch size {}, interval {:?} ({:?})",
            self.dataset.len(),
            self.config.batch_size,
            self.config.interval,
            self.config.pacing
        );

        if let Err(err) = sink.open() {
            error!("display sink failed to open: {err}");
            self.finish(PlaybackStatus::Failed);
            return Err(PlaybackError::Open(err));
        }
        self.emit(PlaybackEvent::Started {
            total_samples: self.cursor.len(),
            total_batches: self.cursor.total_batches(),
        });

        let mut pacer = Pacer::starting_at(self.config.pacing, self.config.interval, started);
        if let Some(PlaybackCommand::Cancel) = pacer.poll(commands) {
            return Ok(self.cancel(started));
        }

        while let Some(batch) = self.cursor.next_batch() {
            if let Err(source) = self.deliver(sink, &batch) {
                error!("display sink failed during batch {}: {source}", batch.index);
                self.finish(PlaybackStatus::Failed);
                return Err(PlaybackError::Sink {
                    batch_index: batch.index,
                    source,
                });
            }
            debug!("batch {} delivered ({} samples)", batch.index, batch.len());
            self.emit(PlaybackEvent::Batch(BatchProgress {
                index: batch.index,
                cursor: self.cursor.position(),
                elapsed: started.elapsed(),
            }));
            if self.cursor.is_finished() {
                break;
            }
            if let Some(PlaybackCommand::Cancel) = pacer.pause(batch.index, commands) {
                return Ok(self.cancel(started));
            }
        }

        let report = self.report(PlaybackStatus::Completed, started);
        info!(
            "playback completed: {} batches in {:.3}s",
            report.batches_delivered, report.elapsed_seconds
        );
        self.finish(PlaybackStatus::Completed);
        Ok(report)
    }

    fn deliver<S: DisplaySink>(&mut self, sink: &mut S, batch: &Batch) -> Result<(), SinkError> {
        let times = &self.dataset.time()[batch.range.clone()];
        for channel in SeriesChannel::ALL {
            let values = &self.dataset.series(channel).values()[batch.range.clone()];
            sink.append_series(channel, times, values)?;
        }
        for gauge in GaugeChannel::ALL {
            for value in self.dataset.gauge(gauge).readings(batch.range.clone()) {
                sink.set_gauge_value(gauge, value)?;
                self.gauge_updates[gauge.index()] += 1;
            }
        }
        Ok(())
    }

    fn cancel(&mut self, started: Instant) -> PlaybackReport {
        let report = self.report(PlaybackStatus::Cancelled, started);
        warn!(
            "playback cancelled after {} of {} batches",
            report.batches_delivered,
            self.cursor.total_batches()
        );
        self.finish(PlaybackStatus::Cancelled);
        report
    }

    fn finish(&mut self, status: PlaybackStatus) {
        self.status.set(status);
        self.emit(PlaybackEvent::Finished(status));
    }

    fn report(&self, status: PlaybackStatus, started: Instant) -> PlaybackReport {
        PlaybackReport {
            status,
            batches_delivered: self.cursor.batches_emitted(),
            samples_delivered: self.cursor.position(),
            total_samples: self.cursor.len(),
            temperature_updates: self.gauge_updates[GaugeChannel::Temperature.index()],
            heart_rate_updates: self.gauge_updates[GaugeChannel::HeartRate.index()],
            elapsed_seconds: started.elapsed().as_secs_f64(),
            nominal_rate: self.config.nominal_rate(),
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }
}
