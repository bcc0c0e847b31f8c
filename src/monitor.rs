//! Peak-memory sampling window.

use crate::device::DeviceAllocator;
use crate::error::{Error, Result};

/// Brackets a time window and reports the peak device memory inside it.
///
/// `start()` records a baseline and resets the allocator's high-water mark;
/// `finish()` reads the mark and closes the window. A window is either open
/// or closed, nothing else is persisted.
#[derive(Debug)]
pub struct SamplingMonitor<A> {
    allocator: A,
    baseline: Option<u64>,
}

impl<A: DeviceAllocator> SamplingMonitor<A> {
    /// Create a closed monitor over `allocator`.
    pub fn new(allocator: A) -> Self {
        Self { allocator, baseline: None }
    }

    /// Open a measurement window. Re-opening an open window restarts it.
    pub fn start(&mut self) {
        self.allocator.synchronize();
        let baseline = self.allocator.memory_allocated();
        self.allocator.reset_peak_memory_stats();
        self.baseline = Some(baseline);
    }

    /// Close the window and return the peak allocated bytes seen since `start()`.
    pub fn finish(&mut self) -> Result<u64> {
        if self.baseline.take().is_none() {
            return Err(Error::phase("SamplingMonitor::finish called without a prior start"));
        }
        self.allocator.synchronize();
        Ok(self.allocator.max_memory_allocated())
    }

    /// Run `f` inside a window, closing it on every exit path.
    pub fn measure<T>(&mut self, f: impl FnOnce(&A) -> T) -> Result<(T, u64)> {
        self.start();
        let value = f(&self.allocator);
        let peak = self.finish()?;
        Ok((value, peak))
    }

    /// Drop an open window without reading it.
    pub fn close(&mut self) {
        self.baseline = None;
    }

    pub fn is_open(&self) -> bool {
        self.baseline.is_some()
    }

    /// Allocated bytes recorded when the current window opened.
    pub fn baseline(&self) -> Option<u64> {
        self.baseline
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }
}
