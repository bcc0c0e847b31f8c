//! Error types with actionable diagnostics.
//!
//! Every failure is fatal to the call that raised it. After a `Phase` or
//! `InvariantViolation` error during collection the ledger is considered
//! corrupt and must be cleared before reuse.

use crate::config::ValidationError;
use thiserror::Error;

/// Result type alias for memstats operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the collectors, the graph model and the configuration layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Operation invoked in the wrong lifecycle state.
    #[error("Phase error: {0}\n  → Call clear() and start_collection() to begin a fresh collection")]
    Phase(String),

    /// Model-data and non-model-data sample sequences fell out of step.
    #[error(
        "Invariant violation: {message} (model samples: {model_samples}, non-model samples: {non_model_samples})\n  → The ledger is corrupt; clear it before reuse"
    )]
    InvariantViolation { message: String, model_samples: usize, non_model_samples: usize },

    /// A graph node lacks required size annotations or breaks topological order.
    #[error("Graph metadata error at node {node}: {message}\n  → Re-run the tracer with memory annotation enabled")]
    GraphMetadata { node: String, message: String },

    /// Device token outside the supported set.
    #[error("Unsupported device: {0}\n  → Supported devices: cpu, cuda")]
    UnsupportedDevice(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration parsed but failed validation.
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a phase error.
    pub fn phase(message: impl Into<String>) -> Self {
        Self::Phase(message.into())
    }

    /// Create a graph metadata error for `node`.
    pub fn graph_metadata(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GraphMetadata { node: node.into(), message: message.into() }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Whether the error leaves the ledger unusable until `clear()`.
    pub fn corrupts_ledger(&self) -> bool {
        matches!(self, Self::Phase(_) | Self::InvariantViolation { .. })
    }
}
