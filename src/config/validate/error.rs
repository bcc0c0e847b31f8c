//! Validation error types

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Graph path is empty")]
    EmptyGraphPath,

    #[error("Graph file does not exist: {0}")]
    GraphPathNotFound(String),

    #[error("Invalid graph file extension: {0} (must be one of: yaml, yml, json)")]
    InvalidGraphExtension(String),

    #[error("Output path is a directory: {0}")]
    OutputIsDirectory(String),

    #[error("Invalid device: {0} (must be one of: cpu, cuda)")]
    InvalidDevice(String),
}
