//! Static estimation of non-model memory from an annotated graph.
//!
//! The forward pass accumulates every node's temporaries and outputs; the
//! backward pass replays the nodes in reverse, letting backward buffers
//! appear, peak and get reclaimed, and records the peak seen between
//! consecutive module boundaries. No kernel runs: only size metadata is used.
//!
//! # Example
//!
//! ```
//! use entrenar_memstats::estimate::StaticCollector;
//! use entrenar_memstats::graph::{GraphBuilder, MemoryAnnotation, OutputDesc};
//! use entrenar_memstats::hooks::ParamRef;
//! use entrenar_memstats::module::{ModuleId, ModuleSpec, ModuleTree};
//!
//! let spec = ModuleSpec::new("net")
//!     .with_child(ModuleSpec::new("fc").with_param(ParamRef::new(0, 64, 4)));
//! let mut tree = ModuleTree::from_spec(&spec);
//!
//! let stats = StaticCollector::collect_traced(&mut tree, |tree| {
//!     let mut b = GraphBuilder::new(tree);
//!     let act = vec![OutputDesc::tensor(&[8, 8], 4)];
//!     let x = b.placeholder("x", MemoryAnnotation::default(), act.clone());
//!     let ann = MemoryAnnotation { fwd_out: 256, bwd_out: 256, ..Default::default() };
//!     let y = b.call_module(ModuleId(1), &[x], ann, act)?;
//!     b.output(&[y]);
//!     b.build()
//! })?;
//!
//! assert_eq!(stats.forward(), &[256]);
//! assert_eq!(stats.backward().len(), 1);
//! # Ok::<(), entrenar_memstats::Error>(())
//! ```

mod simulate;

#[cfg(test)]
mod proptests;

pub use simulate::{LivenessStep, StaticCollector, StaticMemStats};
