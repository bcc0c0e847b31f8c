use super::*;
use crate::device::Device;
use crate::error::Error;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

const GRAPH_YAML: &str = r"
modules:
  name: net
  children:
    - name: fc1
      params:
        - { id: 0, numel: 16, element_size: 4 }
nodes:
  - { id: 0, name: x, op: placeholder, memory: {}, outputs: [{ shape: [4], element_size: 4 }] }
  - { id: 1, name: fc1_marker, op: call_module, target: 1, args: [0], memory: {}, outputs: [{ shape: [4], element_size: 4 }], boundary: 1 }
  - { id: 2, name: fc1, op: call_module, target: 1, args: [1], memory: { fwd_out: 16, bwd_out: 16 }, outputs: [{ shape: [4], element_size: 4 }] }
  - { id: 3, name: output, op: output, args: [2], memory: {} }
";

fn write_dir(config: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("graph.yaml"), GRAPH_YAML).unwrap();
    let config_path = dir.path().join("memstats.yaml");
    fs::write(&config_path, config).unwrap();
    (dir, config_path)
}

#[test]
fn test_load_valid_config_resolves_relative_paths() {
    let (dir, path) = write_dir("device: cuda\ngraph: graph.yaml\noutput: out.txt\nunit: kib\n");
    let spec = load_config(&path).unwrap();
    assert_eq!(spec.graph, dir.path().join("graph.yaml"));
    assert_eq!(spec.output, Some(dir.path().join("out.txt")));
    assert_eq!(spec.unit, ReportUnit::Kib);
    assert_eq!(spec.device().unwrap(), Device::Cuda);
    assert!(!spec.trace);
}

#[test]
fn test_load_config_defaults() {
    let (_dir, path) = write_dir("graph: graph.yaml\n");
    let spec = load_config(&path).unwrap();
    assert_eq!(spec.device, "cuda");
    assert_eq!(spec.unit, ReportUnit::Mib);
    assert_eq!(spec.model_data_bytes, 0);
    assert!(spec.output.is_none());
}

#[test]
fn test_load_config_unsupported_device() {
    let (_dir, path) = write_dir("device: tpu\ngraph: graph.yaml\n");
    assert!(matches!(load_config(&path), Err(Error::UnsupportedDevice(_))));
}

#[test]
fn test_load_config_missing_graph() {
    let (_dir, path) = write_dir("graph: nowhere.yaml\n");
    assert!(matches!(
        load_config(&path),
        Err(Error::Validation(ValidationError::GraphPathNotFound(_)))
    ));
}

#[test]
fn test_load_config_bad_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"graph: [unterminated").unwrap();
    assert!(matches!(load_config(file.path()), Err(Error::Config(_))));
}

#[test]
fn test_load_config_missing_file() {
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_validate_rejects_unknown_extension() {
    let spec = MemStatsSpec {
        device: "cpu".to_string(),
        graph: PathBuf::from("graph.txt"),
        output: None,
        unit: ReportUnit::Bytes,
        model_data_bytes: 0,
        trace: false,
    };
    assert!(matches!(
        validate_config(&spec),
        Err(ValidationError::InvalidGraphExtension(_))
    ));
}

#[test]
fn test_validate_rejects_output_directory() {
    let (dir, _) = write_dir("graph: graph.yaml\n");
    let spec = MemStatsSpec {
        device: "cuda".to_string(),
        graph: dir.path().join("graph.yaml"),
        output: Some(dir.path().to_path_buf()),
        unit: ReportUnit::Mib,
        model_data_bytes: 0,
        trace: false,
    };
    assert!(matches!(
        validate_config(&spec),
        Err(ValidationError::OutputIsDirectory(_))
    ));
}

#[test]
fn test_load_graph_spec_yaml_and_json() {
    let (dir, _) = write_dir("graph: graph.yaml\n");
    let spec = load_graph_spec(dir.path().join("graph.yaml")).unwrap();
    assert_eq!(spec.nodes.len(), 4);

    let json_path = dir.path().join("graph.json");
    fs::write(&json_path, serde_json::to_string(&spec).unwrap()).unwrap();
    assert_eq!(load_graph_spec(&json_path).unwrap(), spec);

    let (tree, graph) = spec.into_parts().unwrap();
    assert_eq!(tree.len(), 2);
    assert_eq!(graph.boundaries().count(), 1);
}

#[test]
fn test_write_results_one_per_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.txt");
    write_results(&path, &[1024 * 1024, 3 * 512 * 1024], ReportUnit::Mib).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "1.000\n1.500\n");

    write_results(&path, &[7, 9], ReportUnit::Bytes).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "7\n9\n");
}

#[test]
fn test_report_unit_scale() {
    assert_eq!(ReportUnit::Kib.scale(2048), 2.0);
    assert_eq!(ReportUnit::Mib.suffix(), "MiB");
}

#[test]
fn test_parse_args_estimate() {
    let cli = parse_args(["memstats", "estimate", "run.yaml", "--trace", "-v"]).unwrap();
    assert!(cli.verbose);
    match cli.command {
        Command::Estimate(args) => {
            assert_eq!(args.config, PathBuf::from("run.yaml"));
            assert!(args.trace);
            assert!(args.output.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_args_info_format() {
    let cli = parse_args(["memstats", "info", "run.yaml", "--format", "json"]).unwrap();
    assert!(matches!(cli.command, Command::Info(InfoArgs { format: OutputFormat::Json, .. })));
    assert!(parse_args(["memstats", "info", "run.yaml", "--format", "xml"]).is_err());
}
