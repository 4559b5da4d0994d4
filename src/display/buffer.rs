use std::collections::VecDeque;

use crate::error::SinkError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesPoint {
    pub time: f64,
    pub value: f64,
}

/// Points currently visible in a scrolling panel.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesFrame {
    pub points: Vec<SeriesPoint>,
    /// Time span (start, end) the panel scrolls over; `end` is the newest time.
    pub x_range: (f64, f64),
}

impl SeriesFrame {
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        let mut values = self.points.iter().map(|p| p.value);
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Rolling buffer that keeps the most recent points of one series.
#[derive(Clone, Debug)]
pub struct SeriesBuffer {
    points: VecDeque<SeriesPoint>,
    capacity: usize,
    total_appended: u64,
}

impl SeriesBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            total_appended: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points appended over the buffer's lifetime, evicted ones included.
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    pub fn latest(&self) -> Option<SeriesPoint> {
        self.points.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }

    pub fn push_batch(&mut self, times: &[f64], values: &[f64]) -> Result<(), SinkError> {
        if times.len() != values.len() {
            return Err(SinkError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        for (&time, &value) in times.iter().zip(values) {
            if self.points.len() == self.capacity {
                self.points.pop_front();
            }
            self.points.push_back(SeriesPoint { time, value });
        }
        self.total_appended += times.len() as u64;
        Ok(())
    }

    /// Points within `x_window` ticks of the newest one.
    pub fn frame(&self, x_window: f64) -> SeriesFrame {
        let Some(newest) = self.latest() else {
            return SeriesFrame {
                points: Vec::new(),
                x_range: (-x_window, 0.0),
            };
        };
        let start = newest.time - x_window;
        let points = self
            .points
            .iter()
            .filter(|p| p.time >= start)
            .copied()
            .collect();
        SeriesFrame {
            points,
            x_range: (start, newest.time),
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.total_appended = 0;
    }
}
