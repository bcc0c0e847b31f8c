//! Rotating read access over a finished sample sequence.

use crate::error::{Error, Result};

/// `(index, total)` read pointer that wraps modulo `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleCursor {
    index: usize,
    total: usize,
}

impl SampleCursor {
    pub fn new(total: usize) -> Self {
        Self { index: 0, total }
    }

    /// Return the current index and advance. Fails while `total == 0`.
    pub fn advance(&mut self) -> Result<usize> {
        if self.total == 0 {
            return Err(Error::phase("cannot read memory stats before a collection has finished"));
        }
        let current = self.index;
        self.index = (self.index + 1) % self.total;
        Ok(current)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Consumer-facing view of a finished non-model sequence.
///
/// Implemented by the runtime collector (after collection) and by
/// [`ReplaySchedule`] (static estimates), so a placement policy reads
/// either one the same way.
pub trait NonModelUsage {
    /// Non-model volume of the next sampling period, rotating forever.
    fn next_non_model_usage(&mut self) -> Result<u64>;

    /// The whole sequence in order.
    fn non_model_data(&self) -> &[u64];

    /// Number of sampling periods per iteration.
    fn period_count(&self) -> usize {
        self.non_model_data().len()
    }
}

/// Owned sequence plus cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySchedule {
    samples: Vec<u64>,
    cursor: SampleCursor,
}

impl ReplaySchedule {
    pub fn new(samples: Vec<u64>) -> Self {
        let cursor = SampleCursor::new(samples.len());
        Self { samples, cursor }
    }

    pub fn cursor(&self) -> SampleCursor {
        self.cursor
    }

    /// Rewind to the first period.
    pub fn rewind(&mut self) {
        self.cursor = SampleCursor::new(self.samples.len());
    }

    /// Largest non-model volume in the schedule.
    pub fn peak(&self) -> u64 {
        self.samples.iter().copied().max().unwrap_or(0)
    }
}

impl NonModelUsage for ReplaySchedule {
    fn next_non_model_usage(&mut self) -> Result<u64> {
        let idx = self.cursor.advance()?;
        Ok(self.samples[idx])
    }

    fn non_model_data(&self) -> &[u64] {
        &self.samples
    }
}
