//! Sample sequences recorded during one collection iteration.

use crate::error::{Error, Result};
use crate::hooks::ParamId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Model-data and non-model-data samples for one training iteration.
///
/// Samples are byte counts, one per parameter-operation boundary. After every
/// completed boundary the two sequences have equal length; between a model
/// sample and its overall sample the model sequence leads by exactly one.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    model_data: Vec<u64>,
    non_model_data: Vec<u64>,
    overall: Vec<u64>,
    sampled_at: Vec<Instant>,
    ungathered_grad_flags: HashMap<ParamId, bool>,
    pending_grad_volume: u64,
    frozen: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wipe all samples and flags and unfreeze.
    pub fn reset(&mut self) {
        self.model_data.clear();
        self.non_model_data.clear();
        self.overall.clear();
        self.sampled_at.clear();
        self.ungathered_grad_flags.clear();
        self.pending_grad_volume = 0;
        self.frozen = false;
    }

    /// Stop accepting samples. Returns the number of non-model samples.
    pub fn freeze(&mut self) -> usize {
        self.frozen = true;
        self.non_model_data.len()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.frozen {
            return Err(Error::phase("ledger is frozen; collection already finished"));
        }
        Ok(())
    }

    fn violation(&self, message: &str) -> Error {
        Error::InvariantViolation {
            message: message.to_string(),
            model_samples: self.model_data.len(),
            non_model_samples: self.non_model_data.len(),
        }
    }

    /// Append a model-data sample.
    pub fn push_model_data(&mut self, bytes: u64) -> Result<()> {
        self.ensure_writable()?;
        self.model_data.push(bytes);
        Ok(())
    }

    /// Append an overall reading and the non-model volume derived from it.
    ///
    /// Requires the model sequence to lead the non-model sequence by one.
    /// Returns the appended non-model volume.
    pub fn push_overall(&mut self, overall: u64) -> Result<u64> {
        self.ensure_writable()?;
        if self.model_data.len() != self.non_model_data.len() + 1 {
            return Err(self.violation("overall sample must follow exactly one model-data sample"));
        }
        let non_model = overall.saturating_sub(self.model_data[self.model_data.len() - 1]);
        self.overall.push(overall);
        self.non_model_data.push(non_model);
        self.sampled_at.push(Instant::now());
        Ok(non_model)
    }

    /// Overwrite the most recent non-model sample instead of appending one.
    pub fn replace_last_non_model(&mut self, bytes: u64) -> Result<()> {
        self.ensure_writable()?;
        match self.non_model_data.last_mut() {
            Some(last) => {
                *last = bytes;
                Ok(())
            }
            None => Err(self.violation("no non-model sample to collapse into")),
        }
    }

    /// Mark `id` as not yet holding a resident gradient.
    pub fn register_param(&mut self, id: ParamId) {
        self.ungathered_grad_flags.insert(id, false);
    }

    /// Mark the gradient of `id` resident. Returns `true` the first time.
    pub fn mark_grad_resident(&mut self, id: ParamId) -> bool {
        let flag = self.ungathered_grad_flags.entry(id).or_insert(false);
        !std::mem::replace(flag, true)
    }

    pub fn is_grad_resident(&self, id: ParamId) -> bool {
        self.ungathered_grad_flags.get(&id).copied().unwrap_or(false)
    }

    /// Record gradient bytes counted twice until the next boundary.
    pub fn add_pending_grad(&mut self, bytes: u64) {
        self.pending_grad_volume += bytes;
    }

    /// Take and zero the pending gradient volume.
    pub fn take_pending_grad(&mut self) -> u64 {
        std::mem::take(&mut self.pending_grad_volume)
    }

    pub fn pending_grad_volume(&self) -> u64 {
        self.pending_grad_volume
    }

    pub fn model_data(&self) -> &[u64] {
        &self.model_data
    }

    pub fn non_model_data(&self) -> &[u64] {
        &self.non_model_data
    }

    /// Raw peak readings behind each non-model sample.
    pub fn overall(&self) -> &[u64] {
        &self.overall
    }

    pub fn last_model_data(&self) -> Option<u64> {
        self.model_data.last().copied()
    }

    pub fn last_non_model_data(&self) -> Option<u64> {
        self.non_model_data.last().copied()
    }

    /// Offsets of each overall sample from the first one.
    pub fn sampling_time(&self) -> Vec<Duration> {
        match self.sampled_at.first() {
            Some(&first) => self.sampled_at.iter().map(|t| t.duration_since(first)).collect(),
            None => Vec::new(),
        }
    }

    /// Both sequences are non-empty and of equal length.
    pub fn check_complete(&self) -> Result<()> {
        if self.model_data.is_empty() || self.model_data.len() != self.non_model_data.len() {
            return Err(self.violation("completed iteration must have aligned, non-empty samples"));
        }
        Ok(())
    }
}
