//! Integration tests for static estimation from traced graphs

use entrenar_memstats::config::{load_config, load_graph_spec, write_results, ReportUnit};
use entrenar_memstats::estimate::StaticCollector;
use entrenar_memstats::graph::{GraphBuilder, GraphSpec, MemoryAnnotation, OutputDesc};
use entrenar_memstats::hooks::ParamRef;
use entrenar_memstats::ledger::NonModelUsage;
use entrenar_memstats::module::{ModuleBoundaryRegistry, ModuleId, ModuleSpec, ModuleTree};
use entrenar_memstats::Error;
use tempfile::TempDir;

/// 256 x 256 fp32 activation.
const ACT: u64 = 256 * 256 * 4;

fn act() -> Vec<OutputDesc> {
    vec![OutputDesc::tensor(&[256, 256], 4)]
}

fn linear() -> MemoryAnnotation {
    MemoryAnnotation { fwd_tmp: 0, fwd_out: ACT, bwd_tmp: 0, bwd_out: ACT }
}

/// `encoder` holds two parameterized layers, `head` one.
fn model_spec() -> ModuleSpec {
    ModuleSpec::new("model")
        .with_child(
            ModuleSpec::new("encoder")
                .with_child(ModuleSpec::new("l0").with_param(ParamRef::new(0, 65536, 4)))
                .with_child(ModuleSpec::new("l1").with_param(ParamRef::new(1, 65536, 4))),
        )
        .with_child(ModuleSpec::new("head").with_param(ParamRef::new(2, 65536, 4)))
}

/// Trace `x -> encoder.l0 -> encoder.l1 -> head -> output` over a marked tree.
fn trace(tree: &ModuleTree) -> entrenar_memstats::Result<entrenar_memstats::graph::Graph> {
    let mut b = GraphBuilder::new(tree);
    let x = b.placeholder("x", MemoryAnnotation::default(), act());
    let l0 = b.call_module(ModuleId(2), &[x], linear(), act())?;
    let l1 = b.call_module(ModuleId(3), &[l0], linear(), act())?;
    let head = b.call_module(ModuleId(4), &[l1], linear(), act())?;
    b.output(&[head]);
    b.build()
}

#[test]
fn test_collect_traced_chain() {
    let mut tree = ModuleTree::from_spec(&model_spec());
    let stats = StaticCollector::collect_traced(&mut tree, trace).expect("simulation should succeed");

    assert_eq!(stats.forward(), &[ACT, 2 * ACT, 3 * ACT]);
    assert_eq!(stats.backward(), &[4 * ACT, 3 * ACT, 2 * ACT]);
    assert_eq!(stats.backward_modules(), &[ModuleId(4), ModuleId(3), ModuleId(2)]);
    assert_eq!(stats.peak(), 4 * ACT);

    // markers were removed again
    assert!(tree.iter().all(|(id, _)| !tree.is_marked(id)));
}

#[test]
fn test_collect_traced_restores_tree_on_trace_failure() {
    let mut tree = ModuleTree::from_spec(&model_spec());
    let result = StaticCollector::collect_traced(&mut tree, |t| {
        let mut b = GraphBuilder::new(t);
        b.call_module(ModuleId(99), &[], linear(), act())?;
        b.build()
    });

    assert!(matches!(result, Err(Error::GraphMetadata { .. })));
    assert!(tree.iter().all(|(id, _)| !tree.is_marked(id)));
}

#[test]
fn test_schedule_replays_static_sequence() {
    let mut tree = ModuleTree::from_spec(&model_spec());
    let stats = StaticCollector::collect_traced(&mut tree, trace).expect("simulation should succeed");
    let expected = stats.non_model_data();
    let mut schedule = stats.into_schedule();

    assert_eq!(schedule.period_count(), 6);
    for _ in 0..2 {
        let read: Vec<u64> = (0..6)
            .map(|_| schedule.next_non_model_usage().expect("schedule should replay"))
            .collect();
        assert_eq!(read, expected);
    }
}

#[test]
fn test_estimate_from_files() {
    let dir = TempDir::new().expect("temp dir should be created");

    let modules = model_spec();
    let mut tree = ModuleTree::from_spec(&modules);
    let mut registry = ModuleBoundaryRegistry::from_tree(&tree);
    registry.refactor(&mut tree).expect("refactor should succeed");
    let graph = trace(&tree).expect("trace should succeed");
    let spec = GraphSpec { modules, nodes: graph.nodes().to_vec() };
    std::fs::write(
        dir.path().join("graph.json"),
        serde_json::to_string_pretty(&spec).expect("graph should serialize"),
    )
    .expect("graph should be written");
    std::fs::write(
        dir.path().join("run.yaml"),
        "device: cuda\ngraph: graph.json\noutput: out.txt\nunit: kib\n",
    )
    .expect("config should be written");

    let config = load_config(dir.path().join("run.yaml")).expect("config should load");
    let (tree, graph) = load_graph_spec(&config.graph)
        .and_then(|g| g.into_parts())
        .expect("graph should load");
    let registry = ModuleBoundaryRegistry::from_tree(&tree);
    assert_eq!(registry.len(), 3);

    let stats = StaticCollector::new(&registry)
        .with_trace()
        .collect(&graph)
        .expect("simulation should succeed");
    assert_eq!(stats.trace().len(), graph.len());
    assert_eq!(stats.trace().last().map(|s| s.total), Some(0));

    let output = config.output.expect("output should be set");
    write_results(&output, &stats.non_model_data(), config.unit).expect("results should be written");
    let written = std::fs::read_to_string(&output).expect("results should be readable");
    assert_eq!(written.lines().next(), Some("256.000"));
    assert_eq!(written.lines().count(), 6);
    assert_eq!(ReportUnit::Kib.format(ACT), "256.000");
}
