//! Entrenar memstats: memory statistics for large-model training.
//!
//! Separates device memory into *model data* (parameters and their
//! gradients) and *non-model data* (activations, temporaries) so a
//! memory manager can decide how much model data to keep resident.
//!
//! Two collectors produce the same sequence of non-model volumes, one
//! value per module boundary crossing of a training iteration:
//!
//! - [`runtime::RuntimeCollector`] samples the allocator around every
//!   parameter operation of the first iteration, then replays.
//! - [`estimate::StaticCollector`] simulates a traced, memory-annotated
//!   graph without running it.

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod estimate;
pub mod graph;
pub mod hooks;
pub mod ledger;
pub mod module;
pub mod monitor;
pub mod runtime;

pub use error::{Error, Result};
