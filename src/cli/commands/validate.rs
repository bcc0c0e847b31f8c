//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, load_graph_spec, MemStatsSpec, ValidateArgs};
use crate::graph::Graph;
use crate::module::{ModuleBoundaryRegistry, ModuleTree};

/// Format the run configuration as a string
pub fn format_run_info(spec: &MemStatsSpec) -> String {
    let mut lines = vec![
        format!("  Device: {}", spec.device),
        format!("  Graph: {}", spec.graph.display()),
        format!("  Unit: {}", spec.unit.suffix()),
    ];
    if let Some(output) = &spec.output {
        lines.push(format!("  Output: {}", output.display()));
    }
    if spec.model_data_bytes > 0 {
        lines.push(format!("  Model data: {} bytes", spec.model_data_bytes));
    }
    lines.join("\n")
}

/// Format graph and boundary counts as a string
pub fn format_graph_info(tree: &ModuleTree, graph: &Graph) -> String {
    let registry = ModuleBoundaryRegistry::from_tree(tree);
    let annotated = graph.nodes().iter().filter(|n| n.memory.is_some()).count();
    [
        format!("  Modules: {}", tree.len()),
        format!("  Parameterized boundaries: {}", registry.len()),
        format!("  Boundary markers in graph: {}", graph.boundaries().count()),
        format!("  Nodes: {} ({annotated} annotated)", graph.len()),
        format!("  Parameter bytes: {}", tree.parameter_bytes()),
    ]
    .join("\n")
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let (tree, graph) = load_graph_spec(&spec.graph)
        .and_then(|g| g.into_parts())
        .map_err(|e| format!("Validation failed: {e}"))?;

    if let Some(node) = graph.nodes().iter().find(|n| n.memory.is_none()) {
        return Err(format!(
            "Validation failed: node '{}' has no memory annotation",
            node.name
        ));
    }

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed {
        println!();
        println!("Configuration Summary:");
        println!("{}", format_run_info(&spec));
        println!();
        println!("{}", format_graph_info(&tree, &graph));
    }

    Ok(())
}
