//! Estimate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, load_graph_spec, write_results, EstimateArgs, ReportUnit};
use crate::estimate::{StaticCollector, StaticMemStats};
use crate::module::{ModuleBoundaryRegistry, ModuleTree};
use tracing::info;

/// Render one line per boundary crossing.
pub fn format_samples(
    stats: &StaticMemStats,
    tree: &ModuleTree,
    unit: ReportUnit,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(stats.forward().len() + stats.backward().len());
    for (i, &bytes) in stats.forward().iter().enumerate() {
        lines.push(format!("  fwd[{i}]  {} {}", unit.format(bytes), unit.suffix()));
    }
    for (i, (&bytes, &module)) in stats.backward().iter().zip(stats.backward_modules()).enumerate() {
        lines.push(format!(
            "  bwd[{i}]  {} {}  ({})",
            unit.format(bytes),
            unit.suffix(),
            tree.qualified_path(module)
        ));
    }
    lines
}

pub fn run_estimate(args: EstimateArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!("Estimating non-model memory: {}", spec.graph.display()),
    );

    let (tree, graph) = load_graph_spec(&spec.graph)
        .and_then(|g| g.into_parts())
        .map_err(|e| format!("Graph error: {e}"))?;
    let registry = ModuleBoundaryRegistry::from_tree(&tree);

    let mut collector = StaticCollector::new(&registry);
    if args.trace || spec.trace {
        collector = collector.with_trace();
    }
    let stats = collector
        .collect(&graph)
        .map_err(|e| format!("Estimation failed: {e}"))?;
    info!(
        boundaries = registry.len(),
        samples = stats.forward().len() + stats.backward().len(),
        "static estimate complete"
    );

    let model_data = if spec.model_data_bytes > 0 {
        spec.model_data_bytes
    } else {
        tree.parameter_bytes()
    };
    let unit = spec.unit;
    log(
        level,
        LogLevel::Normal,
        &format!("Model data: {} {}", unit.format(model_data), unit.suffix()),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("Peak non-model data: {} {}", unit.format(stats.peak()), unit.suffix()),
    );
    for line in format_samples(&stats, &tree, unit) {
        log(level, LogLevel::Normal, &line);
    }

    if !stats.trace().is_empty() {
        log(level, LogLevel::Normal, "Backward liveness trace:");
        for step in stats.trace() {
            let name = graph.nodes().get(step.node).map_or("?", |n| n.name.as_str());
            log(
                level,
                LogLevel::Normal,
                &format!("  {name:<24} total={} peak={}", step.total, step.peak),
            );
        }
    }

    if let Some(output) = args.output.or(spec.output) {
        write_results(&output, &stats.non_model_data(), unit).map_err(|e| e.to_string())?;
        log(
            level,
            LogLevel::Verbose,
            &format!("Results written to {}", output.display()),
        );
    }

    Ok(())
}
