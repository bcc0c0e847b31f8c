//! Configuration validation logic

use super::error::ValidationError;
use crate::config::schema::MemStatsSpec;
use crate::device::Device;

/// Validate a run specification
///
/// Checks:
/// - Device token is supported
/// - Graph file exists and has a known extension
/// - Output path, if any, is not a directory
pub fn validate_config(spec: &MemStatsSpec) -> Result<(), ValidationError> {
    if Device::parse(&spec.device).is_err() {
        return Err(ValidationError::InvalidDevice(spec.device.clone()));
    }

    if spec.graph.as_os_str().is_empty() {
        return Err(ValidationError::EmptyGraphPath);
    }

    let ext = spec
        .graph
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !["yaml", "yml", "json"].contains(&ext.as_str()) {
        return Err(ValidationError::InvalidGraphExtension(
            spec.graph.display().to_string(),
        ));
    }

    if !spec.graph.exists() {
        return Err(ValidationError::GraphPathNotFound(
            spec.graph.display().to_string(),
        ));
    }

    if let Some(output) = &spec.output {
        if output.is_dir() {
            return Err(ValidationError::OutputIsDirectory(
                output.display().to_string(),
            ));
        }
    }

    Ok(())
}
