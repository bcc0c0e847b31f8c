//! Property-based tests for the liveness simulation

use super::*;
use crate::graph::{Graph, GraphBuilder, MemoryAnnotation, OutputDesc};
use crate::hooks::ParamRef;
use crate::module::{ModuleBoundaryRegistry, ModuleId, ModuleSpec, ModuleTree};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Layer {
    out_elems: u64,
    fwd_tmp: u64,
    bwd_tmp: u64,
}

fn arb_layers() -> impl Strategy<Value = (u64, Vec<Layer>)> {
    (
        1u64..4096,
        prop::collection::vec(
            (1u64..4096, 0u64..8192, 0u64..8192)
                .prop_map(|(out_elems, fwd_tmp, bwd_tmp)| Layer { out_elems, fwd_tmp, bwd_tmp }),
            1..8,
        ),
    )
}

fn chain(input_elems: u64, layers: &[Layer]) -> (ModuleTree, ModuleBoundaryRegistry, Graph) {
    let mut spec = ModuleSpec::new("net");
    for (i, _) in layers.iter().enumerate() {
        spec = spec.with_child(ModuleSpec::new(format!("l{i}")).with_param(ParamRef::new(i, 4, 4)));
    }
    let mut tree = ModuleTree::from_spec(&spec);
    let mut registry = ModuleBoundaryRegistry::from_tree(&tree);
    registry.refactor(&mut tree).expect("fresh registry");

    let graph = {
        let mut b = GraphBuilder::new(&tree);
        let mut prev = b.placeholder("x", MemoryAnnotation::default(), vec![OutputDesc::tensor(
            &[input_elems],
            4,
        )]);
        let mut prev_bytes = input_elems * 4;
        for (i, layer) in layers.iter().enumerate() {
            let out_bytes = layer.out_elems * 4;
            let ann = MemoryAnnotation {
                fwd_tmp: layer.fwd_tmp,
                fwd_out: out_bytes,
                bwd_tmp: layer.bwd_tmp,
                bwd_out: prev_bytes,
            };
            prev = b
                .call_module(ModuleId(i + 1), &[prev], ann, vec![OutputDesc::tensor(
                    &[layer.out_elems],
                    4,
                )])
                .expect("module exists");
            prev_bytes = out_bytes;
        }
        b.output(&[prev]);
        b.build().expect("chain is topological")
    };
    (tree, registry, graph)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_peak_never_below_total((input, layers) in arb_layers()) {
        let (_tree, registry, graph) = chain(input, &layers);
        let stats = StaticCollector::new(&registry).with_trace().collect(&graph).unwrap();
        for step in stats.trace() {
            prop_assert!(step.peak >= step.total);
        }
    }

    #[test]
    fn prop_one_sample_per_boundary((input, layers) in arb_layers()) {
        let (_tree, registry, graph) = chain(input, &layers);
        let stats = StaticCollector::new(&registry).collect(&graph).unwrap();
        prop_assert_eq!(stats.forward().len(), layers.len());
        prop_assert_eq!(stats.backward().len(), layers.len());
        prop_assert_eq!(stats.non_model_data().len(), 2 * layers.len());
    }

    #[test]
    fn prop_simulation_is_idempotent((input, layers) in arb_layers()) {
        let (_tree, registry, graph) = chain(input, &layers);
        let collector = StaticCollector::new(&registry).with_trace();
        prop_assert_eq!(collector.collect(&graph).unwrap(), collector.collect(&graph).unwrap());
    }

    #[test]
    fn prop_chain_releases_all_memory((input, layers) in arb_layers()) {
        let (_tree, registry, graph) = chain(input, &layers);
        let stats = StaticCollector::new(&registry).with_trace().collect(&graph).unwrap();
        prop_assert_eq!(stats.trace().last().map(|s| s.total), Some(0));
    }

    #[test]
    fn prop_final_forward_sample_is_total_activation((input, layers) in arb_layers()) {
        let (_tree, registry, graph) = chain(input, &layers);
        let stats = StaticCollector::new(&registry).collect(&graph).unwrap();
        let expected: u64 = layers.iter().map(|l| l.fwd_tmp + l.out_elems * 4).sum();
        prop_assert_eq!(stats.forward().last().copied(), Some(expected));
    }
}
