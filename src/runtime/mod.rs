//! Runtime memory statistics collection.
//!
//! [`RuntimeCollector`] samples the device allocator around every parameter
//! operation of the first training iteration and serves the recorded
//! non-model volumes back, read-only, on every later iteration.
//!
//! # Example
//!
//! ```
//! use entrenar_memstats::device::{Device, SimulatedAllocator};
//! use entrenar_memstats::hooks::{ParamOpHook, ParamRef, TrainingPhase};
//! use entrenar_memstats::ledger::NonModelUsage;
//! use entrenar_memstats::runtime::RuntimeCollector;
//!
//! let alloc = SimulatedAllocator::with_allocated(Device::Cuda, 4096);
//! let mut collector = RuntimeCollector::new(alloc.clone(), 4096);
//! let weight = [ParamRef::new(0, 1024, 4)];
//!
//! collector.start_collection()?;
//! collector.register_params(&weight);
//! collector.pre_forward(&weight)?;
//! alloc.alloc(512);
//! collector.post_forward(&weight)?;
//! collector.with_training_phase(TrainingPhase::Backward, |c| {
//!     c.pre_backward(&weight)?;
//!     alloc.alloc(4096);
//!     c.post_backward(&weight)
//! })?;
//! collector.finish_collection()?;
//!
//! assert_eq!(collector.period_count(), 2);
//! let first = collector.next_non_model_usage()?;
//! assert_eq!(first, 512);
//! # Ok::<(), entrenar_memstats::Error>(())
//! ```

mod collector;


pub use collector::{CollectorPhase, RuntimeCollector};
