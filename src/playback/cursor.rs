use std::ops::Range;

use crate::error::PlaybackError;

/// Contiguous run of samples delivered before the engine pauses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub range: Range<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

pub fn batch_count(len: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        0
    } else {
        len.div_ceil(batch_size)
    }
}

/// Position of the next unconsumed sample. Only moves forward; the final
/// batch is short when `len` is not a multiple of the batch size.
#[derive(Clone, Debug)]
pub struct PlaybackCursor {
    position: usize,
    len: usize,
    batch_size: usize,
    next_index: usize,
}

impl PlaybackCursor {
    pub fn new(len: usize, batch_size: usize) -> Result<Self, PlaybackError> {
        if batch_size == 0 {
            return Err(PlaybackError::InvalidBatchSize);
        }
        Ok(Self {
            position: 0,
            len,
            batch_size,
            next_index: 0,
        })
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.len
    }

    pub fn batches_emitted(&self) -> usize {
        self.next_index
    }

    pub fn total_batches(&self) -> usize {
        batch_count(self.len, self.batch_size)
    }

    pub fn next_batch(&mut self) -> Option<Batch> {
        if self.is_finished() {
            return None;
        }
        let end = (self.position + self.batch_size).min(self.len);
        let batch = Batch {
            index: self.next_index,
            range: self.position..end,
        };
        self.position = end;
        self.next_index += 1;
        Some(batch)
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.next_index = 0;
    }
}

impl Iterator for PlaybackCursor {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        self.next_batch()
    }
}
