//! Loading run specifications, traced graphs, and writing results

use super::schema::{MemStatsSpec, ReportUnit};
use super::validate::validate_config;
use crate::error::{Error, Result};
use crate::graph::GraphSpec;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Load and validate a run specification.
///
/// A relative `graph` or `output` path is resolved against the directory
/// containing the configuration file.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<MemStatsSpec> {
    let config_path = config_path.as_ref();
    let yaml_content = fs::read_to_string(config_path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {}",
            config_path.display(),
            e
        ))
    })?;

    let mut spec: MemStatsSpec = serde_yaml::from_str(&yaml_content)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))?;

    if let Some(base) = config_path.parent() {
        if spec.graph.is_relative() {
            spec.graph = base.join(&spec.graph);
        }
        if let Some(output) = spec.output.as_mut().filter(|o| o.is_relative()) {
            *output = base.join(&*output);
        }
    }

    spec.device()?;
    validate_config(&spec)?;

    Ok(spec)
}

/// Load a traced graph; `.json` files are JSON, everything else YAML.
pub fn load_graph_spec<P: AsRef<Path>>(path: P) -> Result<GraphSpec> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading graph {}", path.display()), e))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON graph: {e}")))
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML graph: {e}")))
    }
}

/// Write `values` one per line, scaled to `unit`.
pub fn write_results<P: AsRef<Path>>(path: P, values: &[u64], unit: ReportUnit) -> Result<()> {
    let path = path.as_ref();
    let context = || format!("writing results to {}", path.display());
    let mut file = fs::File::create(path).map_err(|e| Error::io(context(), e))?;
    for &value in values {
        writeln!(file, "{}", unit.format(value)).map_err(|e| Error::io(context(), e))?;
    }
    Ok(())
}
