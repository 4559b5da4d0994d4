// Pacing between batches.
//
// The wait between two batches is also where cancellation is observed: the
// engine blocks on its command channel for the length of the pause instead of
// sleeping, so a cancel request ends the pause immediately.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::PlaybackCommand;

const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacingMode {
    /// Sleep the full interval after every batch. Processing time is not
    /// compensated, so the replay slowly falls behind the nominal rate.
    #[default]
    FixedDelay,
    /// Batch `k` is followed by a wait until `origin + (k + 1) * interval`.
    /// A late batch skips its wait; there is no burst to catch up further.
    Deadline,
}

#[derive(Debug)]
pub struct Pacer {
    mode: PacingMode,
    interval: Duration,
    origin: Instant,
    commands_connected: bool,
}

impl Pacer {
    pub fn new(mode: PacingMode, interval: Duration) -> Self {
        Self::starting_at(mode, interval, Instant::now())
    }

    pub fn starting_at(mode: PacingMode, interval: Duration, origin: Instant) -> Self {
        Self {
            mode,
            interval,
            origin,
            commands_connected: true,
        }
    }

    /// Pause owed after batch `batch_index` has been delivered at `now`.
    pub fn delay_after(&self, batch_index: usize, now: Instant) -> Duration {
        match self.mode {
            PacingMode::FixedDelay => self.interval,
            PacingMode::Deadline => {
                let ticks = batch_index as u128 + 1;
                let nanos = self.interval.as_nanos().saturating_mul(ticks);
                let offset = u64::try_from(nanos / NANOS_PER_SEC)
                    .ok()
                    .map(|secs| Duration::new(secs, (nanos % NANOS_PER_SEC) as u32));
                match offset.and_then(|offset| self.origin.checked_add(offset)) {
                    Some(deadline) => deadline.saturating_duration_since(now),
                    None => Duration::MAX,
                }
            }
        }
    }

    /// Waits out the pause after `batch_index`, returning early with any
    /// command that arrives meanwhile.
    pub fn pause(
        &mut self,
        batch_index: usize,
        commands: &Receiver<PlaybackCommand>,
    ) -> Option<PlaybackCommand> {
        let now = Instant::now();
        // `None` when the pause ends past what the clock can represent
        let until = now.checked_add(self.delay_after(batch_index, now));
        self.wait_until(until, commands)
    }

    /// Non-blocking check for a pending command.
    pub fn poll(&mut self, commands: &Receiver<PlaybackCommand>) -> Option<PlaybackCommand> {
        self.wait_until(Some(Instant::now()), commands)
    }

    fn wait_until(
        &mut self,
        until: Option<Instant>,
        commands: &Receiver<PlaybackCommand>,
    ) -> Option<PlaybackCommand> {
        if self.commands_connected {
            let timeout = until.map(|until| until.saturating_duration_since(Instant::now()));
            let disconnected = match timeout {
                Some(timeout) if timeout.is_zero() => match commands.try_recv() {
                    Ok(command) => return Some(command),
                    Err(err) => err == TryRecvError::Disconnected,
                },
                Some(timeout) => match commands.recv_timeout(timeout) {
                    Ok(command) => return Some(command),
                    Err(err) => err == RecvTimeoutError::Disconnected,
                },
                None => match commands.recv() {
                    Ok(command) => return Some(command),
                    Err(_) => true,
                },
            };
            if !disconnected {
                return None;
            }
            debug!("playback command channel closed; pacing continues without control");
            self.commands_connected = false;
        }
        match until {
            Some(until) => {
                let remaining = until.saturating_duration_since(Instant::now());
                if !remaining.is_zero() {
                    thread::sleep(remaining);
                }
            }
            None => loop {
                thread::sleep(Duration::from_secs(u64::MAX));
            },
        }
        None
    }
}
