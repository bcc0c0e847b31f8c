//! Collecting / replaying state machine driven by parameter-operation hooks.

use crate::device::{Device, DeviceAllocator};
use crate::error::{Error, Result};
use crate::hooks::{ParamOpHook, ParamRef, TrainingPhase};
use crate::ledger::{MemoryLedger, NonModelUsage, SampleCursor};
use crate::monitor::SamplingMonitor;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of a [`RuntimeCollector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectorPhase {
    /// No collection has started since construction or `clear()`.
    #[default]
    Idle,
    /// Recording ground truth for the current iteration.
    Collecting,
    /// Serving the frozen sequence through the cursor.
    Replaying,
}

/// Samples model data vs. non-model data around each parameter operation.
#[derive(Debug)]
pub struct RuntimeCollector<A> {
    monitor: SamplingMonitor<A>,
    ledger: MemoryLedger,
    cursor: SampleCursor,
    phase: CollectorPhase,
    training_phase: TrainingPhase,
    /// Resident model data before any gradient exists.
    base_model_data: u64,
    /// Parameters plus gradients known to be resident so far.
    model_data_mem: u64,
}

impl<A: DeviceAllocator> RuntimeCollector<A> {
    /// Create an idle collector. `model_data_bytes` is the resident parameter
    /// volume at the start of each iteration.
    pub fn new(allocator: A, model_data_bytes: u64) -> Self {
        Self {
            monitor: SamplingMonitor::new(allocator),
            ledger: MemoryLedger::new(),
            cursor: SampleCursor::default(),
            phase: CollectorPhase::Idle,
            training_phase: TrainingPhase::Forward,
            base_model_data: model_data_bytes,
            model_data_mem: model_data_bytes,
        }
    }

    pub fn device(&self) -> Device {
        self.monitor.allocator().device()
    }

    pub fn phase(&self) -> CollectorPhase {
        self.phase
    }

    pub fn is_collecting(&self) -> bool {
        self.phase == CollectorPhase::Collecting
    }

    pub fn training_phase(&self) -> TrainingPhase {
        self.training_phase
    }

    pub fn set_training_phase(&mut self, phase: TrainingPhase) {
        self.training_phase = phase;
    }

    /// Run `f` with the training phase set to `phase`, restoring the previous
    /// phase afterwards whether `f` succeeded or not.
    pub fn with_training_phase<R>(
        &mut self,
        phase: TrainingPhase,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = std::mem::replace(&mut self.training_phase, phase);
        let result = f(self);
        self.training_phase = previous;
        result
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    /// Running estimate of resident parameters plus gradients.
    pub fn model_data_mem(&self) -> u64 {
        self.model_data_mem
    }

    /// Begin a collection iteration: reset the ledger and open a window.
    pub fn start_collection(&mut self) -> Result<()> {
        match self.phase {
            CollectorPhase::Idle => {}
            CollectorPhase::Collecting => {
                return Err(Error::phase("collection already in progress"));
            }
            CollectorPhase::Replaying => {
                return Err(Error::phase(
                    "collection already finished; clear() before collecting again",
                ));
            }
        }
        self.ledger.reset();
        self.model_data_mem = self.base_model_data;
        self.training_phase = TrainingPhase::Forward;
        self.monitor.start();
        self.phase = CollectorPhase::Collecting;
        info!(device = %self.device(), model_data = self.model_data_mem, "memstats collection started");
        Ok(())
    }

    /// Mark every trainable parameter as holding no resident gradient yet.
    pub fn register_params(&mut self, params: &[ParamRef]) {
        for p in params.iter().filter(|p| p.requires_grad) {
            self.ledger.register_param(p.id);
        }
    }

    /// Append the resident model-data volume for the operation on `params`.
    ///
    /// During backward every trainable parameter of the operation is about to
    /// receive a gradient. The first time a gradient appears it joins the
    /// running model-data estimate; a repeat appearance is a transient
    /// double count and goes to the pending volume instead.
    pub fn sample_model_data(&mut self, params: &[ParamRef]) -> Result<()> {
        if !self.is_collecting() {
            return Ok(());
        }
        let volume = match self.training_phase {
            TrainingPhase::Forward => self.model_data_mem,
            TrainingPhase::Backward => {
                let mut volume = self.model_data_mem;
                for p in params.iter().filter(|p| p.requires_grad) {
                    let bytes = p.bytes();
                    volume += bytes;
                    if self.ledger.mark_grad_resident(p.id) {
                        self.model_data_mem += bytes;
                    } else {
                        self.ledger.add_pending_grad(bytes);
                    }
                }
                volume
            }
        };
        self.ledger.push_model_data(volume)
    }

    /// Close the window, append `overall − last model data`, reopen.
    ///
    /// A no-op on an empty ledger. Otherwise the model-data sequence must
    /// lead by exactly one sample.
    pub fn sample_overall_data(&mut self) -> Result<()> {
        if !self.is_collecting() || self.ledger.model_data().is_empty() {
            return Ok(());
        }
        let overall = self.monitor.finish()?;
        self.record_overall(overall)?;
        self.monitor.start();
        Ok(())
    }

    fn record_overall(&mut self, overall: u64) -> Result<()> {
        let non_model = self.ledger.push_overall(overall)?;
        debug!(
            sample = self.ledger.non_model_data().len() - 1,
            phase = ?self.training_phase,
            overall,
            non_model,
            "non-model sample"
        );
        Ok(())
    }

    /// Fold pending gradient volume into the previous non-model sample.
    ///
    /// Heuristic: the collapsed value is the largest of the previous sample,
    /// the window peak net of the double-counted gradients, and the current
    /// allocation net of the running model-data estimate.
    fn collapse_pending(&mut self, overall: u64) -> Result<()> {
        let model_samples = self.ledger.model_data().len();
        let non_model_samples = self.ledger.non_model_data().len();
        if model_samples != non_model_samples {
            return Err(Error::InvariantViolation {
                message: "pending gradient volume without a closing sample".to_string(),
                model_samples,
                non_model_samples,
            });
        }
        let pending = self.ledger.take_pending_grad();
        let (Some(previous), Some(last_model)) =
            (self.ledger.last_non_model_data(), self.ledger.last_model_data())
        else {
            return Err(Error::InvariantViolation {
                message: "pending gradient volume before any sample".to_string(),
                model_samples,
                non_model_samples,
            });
        };
        let window_net = overall.saturating_sub(pending).saturating_sub(last_model);
        let allocated_net =
            self.monitor.allocator().memory_allocated().saturating_sub(self.model_data_mem);
        let collapsed = previous.max(window_net).max(allocated_net);
        warn!(
            pending,
            previous, window_net, allocated_net, collapsed, "collapsing double-counted gradient volume"
        );
        self.ledger.replace_last_non_model(collapsed)
    }

    fn pre_op(&mut self, params: &[ParamRef]) -> Result<()> {
        if !self.is_collecting() {
            return Ok(());
        }
        let overall = self.monitor.finish()?;
        if !self.ledger.model_data().is_empty() {
            if self.training_phase == TrainingPhase::Backward
                && self.ledger.pending_grad_volume() > 0
            {
                self.collapse_pending(overall)?;
            } else {
                self.record_overall(overall)?;
            }
        }
        self.sample_model_data(params)?;
        self.monitor.start();
        Ok(())
    }

    fn post_op(&mut self) -> Result<()> {
        if self.is_collecting()
            && self.training_phase == TrainingPhase::Backward
            && self.ledger.pending_grad_volume() > 0
        {
            let overall = self.monitor.finish()?;
            self.record_overall(overall)?;
            self.monitor.start();
        }
        Ok(())
    }

    /// Take the closing sample, freeze the ledger and switch to replay.
    pub fn finish_collection(&mut self) -> Result<()> {
        if !self.is_collecting() {
            return Err(Error::phase("finish_collection called outside a collection"));
        }
        if self.ledger.model_data().is_empty() {
            return Err(Error::InvariantViolation {
                message: "no parameter operation was sampled during the collection".to_string(),
                model_samples: 0,
                non_model_samples: self.ledger.non_model_data().len(),
            });
        }
        let overall = self.monitor.finish()?;
        if self.ledger.pending_grad_volume() > 0 {
            self.collapse_pending(overall)?;
        } else {
            self.record_overall(overall)?;
        }
        self.ledger.check_complete()?;
        let total = self.ledger.freeze();
        self.cursor = SampleCursor::new(total);
        self.phase = CollectorPhase::Replaying;
        info!(periods = total, "memstats collection finished");
        Ok(())
    }

    /// Non-model volume of the next sampling period.
    pub fn next_non_model_usage(&mut self) -> Result<u64> {
        if self.is_collecting() {
            return Err(Error::phase("cannot read memory stats during the collection phase"));
        }
        let idx = self.cursor.advance()?;
        Ok(self.ledger.non_model_data()[idx])
    }

    /// Wipe the ledger and return to the idle state.
    pub fn clear(&mut self) {
        self.ledger.reset();
        self.cursor.reset();
        self.monitor.close();
        self.phase = CollectorPhase::Idle;
        self.training_phase = TrainingPhase::Forward;
        self.model_data_mem = self.base_model_data;
    }

    /// `samples` if `device` is the sampled device.
    ///
    /// A collector samples one allocator, so the other supported token has
    /// no series and is reported as unsupported for this collector.
    fn samples_for<'a>(&self, device: &str, samples: &'a [u64]) -> Result<&'a [u64]> {
        let requested = Device::parse(device)?;
        let sampled = self.device();
        if requested == sampled {
            Ok(samples)
        } else {
            Err(Error::UnsupportedDevice(format!(
                "{requested} (this collector samples {sampled} only)"
            )))
        }
    }

    /// Model-data samples for `device` ("cpu" or "cuda"); only the
    /// collector's own device has a series.
    pub fn model_data_list(&self, device: &str) -> Result<&[u64]> {
        self.samples_for(device, self.ledger.model_data())
    }

    /// Non-model-data samples for `device` ("cpu" or "cuda").
    pub fn non_model_data_list(&self, device: &str) -> Result<&[u64]> {
        self.samples_for(device, self.ledger.non_model_data())
    }

    /// Raw overall readings for `device` ("cpu" or "cuda").
    pub fn overall_mem_stats(&self, device: &str) -> Result<&[u64]> {
        self.samples_for(device, self.ledger.overall())
    }

    pub fn sampling_time(&self) -> Vec<Duration> {
        self.ledger.sampling_time()
    }
}

impl<A: DeviceAllocator> ParamOpHook for RuntimeCollector<A> {
    fn pre_forward(&mut self, params: &[ParamRef]) -> Result<()> {
        self.pre_op(params)
    }

    fn post_forward(&mut self, _params: &[ParamRef]) -> Result<()> {
        self.post_op()
    }

    fn pre_backward(&mut self, params: &[ParamRef]) -> Result<()> {
        self.pre_op(params)
    }

    fn post_backward(&mut self, _params: &[ParamRef]) -> Result<()> {
        self.post_op()
    }
}

impl<A: DeviceAllocator> NonModelUsage for RuntimeCollector<A> {
    fn next_non_model_usage(&mut self) -> Result<u64> {
        RuntimeCollector::next_non_model_usage(self)
    }

    fn non_model_data(&self) -> &[u64] {
        self.ledger.non_model_data()
    }
}
