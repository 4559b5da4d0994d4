use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ChannelId, PlaybackStatus};

/// Failures while reading a recorded dataset.
///
/// `Io`, `Csv` and `InvalidNumber` are the data-load family (file missing,
/// unreadable, or a cell that is not a number). The remaining variants are
/// schema failures: the columns could not be assigned to channels.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}, column {column}: {value:?} is not a number")]
    InvalidNumber {
        line: u64,
        column: usize,
        value: String,
    },
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("unknown column name {0:?}")]
    UnknownColumn(String),
    #[error("column layout assigns {0} more than once")]
    DuplicateColumn(ChannelId),
    #[error("column layout does not assign {0}")]
    MissingColumn(ChannelId),
}

impl LoadError {
    /// True for failures caused by the column layout or row shape rather than
    /// by the bytes on disk.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            LoadError::ColumnCount { .. }
                | LoadError::UnknownColumn(_)
                | LoadError::DuplicateColumn(_)
                | LoadError::MissingColumn(_)
        )
    }
}

/// Failures reported by a display sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("display sink is not open")]
    NotOpen,
    #[error("series append has {times} time points but {values} values")]
    LengthMismatch { times: usize, values: usize },
    #[error("display sink rejected the update: {0}")]
    Rejected(String),
    #[error("display sink i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("display sink failed to write record: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
    #[error("playback is {0}; reset it before starting again")]
    NotIdle(PlaybackStatus),
    #[error("display sink failed to open: {0}")]
    Open(#[source] SinkError),
    #[error("display sink failed during batch {batch_index}: {source}")]
    Sink {
        batch_index: usize,
        #[source]
        source: SinkError,
    },
    #[error("display sink failed to close: {0}")]
    Close(#[source] SinkError),
    #[error("playback thread panicked")]
    WorkerPanicked,
}

impl PlaybackError {
    /// Index of the batch whose delivery failed, if the failure happened
    /// mid-playback.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            PlaybackError::Sink { batch_index, .. } => Some(*batch_index),
            _ => None,
        }
    }
}

/// Failures while rendering a dashboard snapshot.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("failed to render plot: {0}")]
    Render(String),
    #[error("failed to encode plot: {0}")]
    Encode(#[from] image::ImageError),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for PlotError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        PlotError::Render(format!("{value:?}"))
    }
}
