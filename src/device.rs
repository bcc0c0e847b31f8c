//! Device tokens and the allocator seam the collectors read from.
//!
//! The collectors never allocate or move memory themselves. They only ask
//! a [`DeviceAllocator`] how many bytes are currently allocated and what
//! the peak has been since the last reset.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

/// Device whose allocator is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    #[default]
    Cuda,
}

impl Device {
    /// Parse a device token, rejecting anything outside {"cpu", "cuda"}.
    pub fn parse(token: &str) -> Result<Self> {
        token.parse()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda),
            _ => Err(Error::UnsupportedDevice(s.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a device memory allocator.
///
/// Mirrors the allocator statistics exposed by CUDA caching allocators:
/// a current reading, a high-water mark, and a way to reset the mark.
pub trait DeviceAllocator {
    /// Device this allocator manages.
    fn device(&self) -> Device;

    /// Bytes currently allocated.
    fn memory_allocated(&self) -> u64;

    /// Highest `memory_allocated()` value since the last peak reset.
    fn max_memory_allocated(&self) -> u64;

    /// Reset the high-water mark to the current allocation.
    fn reset_peak_memory_stats(&self);

    /// Wait for outstanding device work so readings are settled.
    fn synchronize(&self) {}
}

#[derive(Debug, Default)]
struct AllocatorState {
    allocated: u64,
    peak: u64,
}

/// Deterministic in-process allocator.
///
/// Cloning yields another handle to the same counters, so a test (or a
/// replayed trace) can allocate and free while a collector holds its own
/// handle.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAllocator {
    device: Device,
    state: Arc<Mutex<AllocatorState>>,
}

impl SimulatedAllocator {
    /// Create an empty allocator for `device`.
    pub fn new(device: Device) -> Self {
        Self { device, state: Arc::default() }
    }

    /// Create an allocator that already holds `bytes` (e.g. resident parameters).
    pub fn with_allocated(device: Device, bytes: u64) -> Self {
        let allocator = Self::new(device);
        allocator.alloc(bytes);
        allocator
    }

    /// Allocate `bytes`, raising the peak if needed.
    pub fn alloc(&self, bytes: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.allocated += bytes;
        state.peak = state.peak.max(state.allocated);
    }

    /// Release `bytes`. Over-release clamps at zero.
    pub fn free(&self, bytes: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if bytes > state.allocated {
            tracing::warn!(
                requested = bytes,
                allocated = state.allocated,
                "simulated allocator asked to free more than it holds"
            );
        }
        state.allocated = state.allocated.saturating_sub(bytes);
    }

    /// Allocate `bytes` and immediately free them: a transient spike that
    /// only the peak counter sees.
    pub fn spike(&self, bytes: u64) {
        self.alloc(bytes);
        self.free(bytes);
    }
}

impl DeviceAllocator for SimulatedAllocator {
    fn device(&self) -> Device {
        self.device
    }

    fn memory_allocated(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).allocated
    }

    fn max_memory_allocated(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).peak
    }

    fn reset_peak_memory_stats(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.peak = state.allocated;
    }
}
