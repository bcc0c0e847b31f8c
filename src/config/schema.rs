//! YAML schema for a memstats run

use crate::device::Device;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unit used when reporting byte volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportUnit {
    Bytes,
    Kib,
    #[default]
    Mib,
}

impl ReportUnit {
    pub fn scale(self, bytes: u64) -> f64 {
        match self {
            ReportUnit::Bytes => bytes as f64,
            ReportUnit::Kib => bytes as f64 / 1024.0,
            ReportUnit::Mib => bytes as f64 / (1024.0 * 1024.0),
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ReportUnit::Bytes => "B",
            ReportUnit::Kib => "KiB",
            ReportUnit::Mib => "MiB",
        }
    }

    /// Render `bytes` in this unit.
    pub fn format(self, bytes: u64) -> String {
        match self {
            ReportUnit::Bytes => bytes.to_string(),
            _ => format!("{:.3}", self.scale(bytes)),
        }
    }
}

fn default_device() -> String {
    "cuda".to_string()
}

/// Complete memstats run specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemStatsSpec {
    /// Device whose memory is estimated ("cpu" or "cuda")
    #[serde(default = "default_device")]
    pub device: String,

    /// Traced, memory-annotated graph (YAML or JSON)
    pub graph: PathBuf,

    /// Results file, one value per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub unit: ReportUnit,

    /// Resident model data at the start of an iteration
    #[serde(default)]
    pub model_data_bytes: u64,

    /// Record the per-node backward liveness trace
    #[serde(default)]
    pub trace: bool,
}

impl MemStatsSpec {
    /// Parsed device; fails for tokens outside {"cpu", "cuda"}.
    pub fn device(&self) -> Result<Device> {
        Device::parse(&self.device)
    }
}
