//! Declarative run configuration and CLI argument types.

mod cli;
mod loader;
mod schema;
mod validate;

#[cfg(test)]
mod tests;

pub use cli::{parse_args, Cli, Command, EstimateArgs, InfoArgs, OutputFormat, ValidateArgs};
pub use loader::{load_config, load_graph_spec, write_results};
pub use schema::{MemStatsSpec, ReportUnit};
pub use validate::{validate_config, ValidationError};
