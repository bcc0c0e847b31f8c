//! Info command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, load_graph_spec, InfoArgs, OutputFormat};
use crate::module::{ModuleBoundaryEntry, ModuleBoundaryRegistry};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct InfoReport<'a> {
    device: &'a str,
    nodes: usize,
    parameter_bytes: u64,
    boundaries: &'a [ModuleBoundaryEntry],
}

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let (tree, graph) = load_graph_spec(&spec.graph)
        .and_then(|g| g.into_parts())
        .map_err(|e| format!("Graph error: {e}"))?;
    let registry = ModuleBoundaryRegistry::from_tree(&tree);

    let report = InfoReport {
        device: &spec.device,
        nodes: graph.len(),
        parameter_bytes: tree.parameter_bytes(),
        boundaries: registry.entries(),
    };

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Memstats Info:");
            println!();
            println!("Device: {}", report.device);
            println!("Graph nodes: {}", report.nodes);
            println!("Parameter bytes: {}", report.parameter_bytes);
            println!("Boundaries ({}):", registry.len());
            for entry in report.boundaries {
                println!("  {} ({})", entry.qualified_path, entry.local_name);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&report)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
