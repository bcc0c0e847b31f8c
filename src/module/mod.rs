//! Module tree and the registry of parameterized module boundaries.

mod registry;
mod tree;


pub use registry::{ModuleBoundaryEntry, ModuleBoundaryRegistry};
pub use tree::{Module, ModuleId, ModuleSpec, ModuleTree};
