//! Memory-annotated dataflow graph consumed by static estimation.
//!
//! Nodes come from an external symbolic tracer in topological order. Each
//! node carries four size annotations (forward temporaries, forward
//! outputs, backward temporaries, backward outputs) and an explicit
//! [`BoundaryMarker`] for module boundaries.

mod builder;
mod node;


pub use builder::GraphBuilder;
pub use node::{
    BoundaryMarker, Graph, GraphNode, GraphSpec, MemoryAnnotation, NodeId, OpKind, OutputDesc,
};
