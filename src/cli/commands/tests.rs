//! CLI command tests

use super::estimate::format_samples;
use super::validate::{format_graph_info, format_run_info};
use super::*;
use crate::config::*;
use crate::estimate::StaticCollector;
use crate::graph::{GraphBuilder, GraphSpec, MemoryAnnotation, OutputDesc};
use crate::hooks::ParamRef;
use crate::module::{ModuleBoundaryRegistry, ModuleId, ModuleSpec, ModuleTree};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const B: u64 = 1024;

fn model_spec() -> ModuleSpec {
    ModuleSpec::new("net")
        .with_child(ModuleSpec::new("fc1").with_param(ParamRef::new(0, 64, 4)))
        .with_child(ModuleSpec::new("fc2").with_param(ParamRef::new(1, 64, 4)))
}

fn graph_spec() -> GraphSpec {
    let modules = model_spec();
    let mut tree = ModuleTree::from_spec(&modules);
    let mut registry = ModuleBoundaryRegistry::from_tree(&tree);
    registry.refactor(&mut tree).unwrap();

    let act = || vec![OutputDesc::tensor(&[B / 4], 4)];
    let linear = MemoryAnnotation { fwd_tmp: 0, fwd_out: B, bwd_tmp: 0, bwd_out: B };
    let mut b = GraphBuilder::new(&tree);
    let x = b.placeholder("x", MemoryAnnotation::default(), act());
    let h1 = b.call_module(ModuleId(1), &[x], linear, act()).unwrap();
    let h2 = b.call_module(ModuleId(2), &[h1], linear, act()).unwrap();
    b.output(&[h2]);
    let graph = b.build().unwrap();

    GraphSpec { modules, nodes: graph.nodes().to_vec() }
}

/// Write a graph and a config referencing it; returns the config path.
fn create_test_config(dir: &TempDir, extra: &str) -> PathBuf {
    let graph_path = dir.path().join("graph.yaml");
    std::fs::write(&graph_path, serde_yaml::to_string(&graph_spec()).unwrap()).unwrap();

    let config_path = dir.path().join("memstats.yaml");
    std::fs::write(&config_path, format!("device: cuda\ngraph: graph.yaml\nunit: bytes\n{extra}"))
        .unwrap();
    config_path
}

fn estimate_args(config: &Path) -> EstimateArgs {
    EstimateArgs { config: config.to_path_buf(), output: None, trace: false }
}

#[test]
fn test_estimate_writes_results() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "output: stats.txt\n");

    estimate::run_estimate(estimate_args(&config), LogLevel::Quiet).unwrap();

    let written = std::fs::read_to_string(dir.path().join("stats.txt")).unwrap();
    let values: Vec<u64> = written.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(values, vec![B, 2 * B, 3 * B, 2 * B]);
}

#[test]
fn test_estimate_output_override_and_trace() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "output: stats.txt\n");
    let override_path = dir.path().join("override.txt");

    let args = EstimateArgs {
        config,
        output: Some(override_path.clone()),
        trace: true,
    };
    estimate::run_estimate(args, LogLevel::Quiet).unwrap();

    assert!(override_path.exists());
    assert!(!dir.path().join("stats.txt").exists());
}

#[test]
fn test_estimate_missing_config() {
    let err = estimate::run_estimate(estimate_args(Path::new("/no/such.yaml")), LogLevel::Quiet)
        .unwrap_err();
    assert!(err.starts_with("Config error"));
}

#[test]
fn test_estimate_rejects_unannotated_graph() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");
    let mut spec = graph_spec();
    spec.nodes[2].memory = None;
    std::fs::write(dir.path().join("graph.yaml"), serde_yaml::to_string(&spec).unwrap()).unwrap();

    let err = estimate::run_estimate(estimate_args(&config), LogLevel::Quiet).unwrap_err();
    assert!(err.starts_with("Estimation failed"));
    assert!(err.contains("fc1"));
}

#[test]
fn test_validate_command_basic() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");

    let args = ValidateArgs { config, detailed: true };
    assert!(validate::run_validate(args, LogLevel::Quiet).is_ok());
}

#[test]
fn test_validate_command_unannotated_node() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");
    let mut spec = graph_spec();
    spec.nodes[0].memory = None;
    std::fs::write(dir.path().join("graph.yaml"), serde_yaml::to_string(&spec).unwrap()).unwrap();

    let err = validate::run_validate(ValidateArgs { config, detailed: false }, LogLevel::Quiet)
        .unwrap_err();
    assert!(err.contains("'x'"));
}

#[test]
fn test_validate_command_bad_device() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");
    std::fs::write(&config, "device: tpu\ngraph: graph.yaml\n").unwrap();

    let err = validate::run_validate(ValidateArgs { config, detailed: false }, LogLevel::Quiet)
        .unwrap_err();
    assert!(err.contains("tpu"));
}

#[test]
fn test_info_command_all_formats() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");

    for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Yaml] {
        let args = InfoArgs { config: config.clone(), format };
        assert!(info::run_info(args, LogLevel::Quiet).is_ok());
    }
}

#[test]
fn test_run_command_dispatch() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");
    let config = config.to_str().unwrap();

    let cli = parse_args(["memstats", "validate", config, "-q"]).unwrap();
    assert!(run_command(cli).is_ok());

    let cli = parse_args(["memstats", "estimate", config, "-q"]).unwrap();
    assert!(run_command(cli).is_ok());
}

#[test]
fn test_format_run_info() {
    let spec = MemStatsSpec {
        device: "cpu".to_string(),
        graph: PathBuf::from("/graphs/net.yaml"),
        output: Some(PathBuf::from("/out/stats.txt")),
        unit: ReportUnit::Kib,
        model_data_bytes: 4096,
        trace: false,
    };
    let info = format_run_info(&spec);
    assert!(info.contains("cpu"));
    assert!(info.contains("/graphs/net.yaml"));
    assert!(info.contains("/out/stats.txt"));
    assert!(info.contains("KiB"));
    assert!(info.contains("4096"));
}

#[test]
fn test_format_graph_info_counts() {
    let (tree, graph) = graph_spec().into_parts().unwrap();
    let info = format_graph_info(&tree, &graph);
    assert!(info.contains("Modules: 3"));
    assert!(info.contains("Parameterized boundaries: 2"));
    assert!(info.contains("Boundary markers in graph: 2"));
    assert!(info.contains("Parameter bytes: 512"));
}

#[test]
fn test_format_samples_names_backward_modules() {
    let (tree, graph) = graph_spec().into_parts().unwrap();
    let registry = ModuleBoundaryRegistry::from_tree(&tree);
    let stats = StaticCollector::new(&registry).collect(&graph).unwrap();

    let lines = format_samples(&stats, &tree, ReportUnit::Bytes);
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("fwd[0]"));
    assert!(lines[2].contains("(fc2)"));
    assert!(lines[3].contains("(fc1)"));
}

#[test]
fn test_log_level_from_flags() {
    assert_eq!(LogLevel::from_flags(true, true), LogLevel::Quiet);
    assert_eq!(LogLevel::from_flags(true, false), LogLevel::Verbose);
    assert_eq!(LogLevel::from_flags(false, false), LogLevel::Normal);
}
