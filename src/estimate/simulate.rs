//! Forward accumulation and backward liveness replay.

use crate::error::{Error, Result};
use crate::graph::{Graph, GraphNode, MemoryAnnotation, OpKind};
use crate::ledger::ReplaySchedule;
use crate::module::{ModuleBoundaryRegistry, ModuleId, ModuleTree};
use serde::Serialize;
use tracing::{debug, warn};

/// Running total and peak after one node of the backward replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivenessStep {
    pub node: usize,
    pub total: i64,
    pub peak: i64,
}

/// Result of one static simulation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StaticMemStats {
    forward: Vec<u64>,
    backward: Vec<u64>,
    backward_modules: Vec<ModuleId>,
    trace: Vec<LivenessStep>,
}

impl StaticMemStats {
    /// Accumulated activation memory at each forward boundary.
    pub fn forward(&self) -> &[u64] {
        &self.forward
    }

    /// Peak memory of each backward boundary, in backward order.
    pub fn backward(&self) -> &[u64] {
        &self.backward
    }

    /// Module of each backward sample.
    pub fn backward_modules(&self) -> &[ModuleId] {
        &self.backward_modules
    }

    /// Per-node backward trace; empty unless tracing was requested.
    pub fn trace(&self) -> &[LivenessStep] {
        &self.trace
    }

    /// Forward samples followed by backward samples, one per boundary crossing.
    pub fn non_model_data(&self) -> Vec<u64> {
        self.forward.iter().chain(&self.backward).copied().collect()
    }

    pub fn peak(&self) -> u64 {
        self.forward.iter().chain(&self.backward).copied().max().unwrap_or(0)
    }

    /// Hand the sequence to the rotating replay consumer.
    pub fn into_schedule(self) -> ReplaySchedule {
        ReplaySchedule::new(self.non_model_data())
    }
}

/// Simulates a training step over a memory-annotated graph.
#[derive(Debug, Clone)]
pub struct StaticCollector<'r> {
    registry: &'r ModuleBoundaryRegistry,
    record_trace: bool,
}

/// Per-node state derived once per run; the graph itself is never touched.
#[derive(Debug, Clone, Copy, Default)]
struct NodeState {
    ann: MemoryAnnotation,
    boundary: Option<ModuleId>,
    fwd_out_released: bool,
    grad_computed: bool,
}

fn clamp(bytes: i64) -> u64 {
    u64::try_from(bytes).unwrap_or(0)
}

fn overflow(node: &GraphNode) -> Error {
    Error::graph_metadata(&node.name, "byte size overflows")
}

/// `total + bytes`, failing on overflow instead of wrapping.
fn add(total: i64, bytes: u64, node: &GraphNode) -> Result<i64> {
    i64::try_from(bytes)
        .ok()
        .and_then(|b| total.checked_add(b))
        .ok_or_else(|| overflow(node))
}

/// `total - bytes`, failing on overflow instead of wrapping.
fn sub(total: i64, bytes: u64, node: &GraphNode) -> Result<i64> {
    i64::try_from(bytes)
        .ok()
        .and_then(|b| total.checked_sub(b))
        .ok_or_else(|| overflow(node))
}

impl<'r> StaticCollector<'r> {
    pub fn new(registry: &'r ModuleBoundaryRegistry) -> Self {
        Self { registry, record_trace: false }
    }

    /// Also record a [`LivenessStep`] per backward node.
    pub fn with_trace(mut self) -> Self {
        self.record_trace = true;
        self
    }

    /// Register boundaries on `tree`, mark them, trace, unmark, simulate.
    ///
    /// The tree's markers are restored even when `trace` fails.
    pub fn collect_traced<F>(tree: &mut ModuleTree, trace: F) -> Result<StaticMemStats>
    where
        F: FnOnce(&ModuleTree) -> Result<Graph>,
    {
        let mut registry = ModuleBoundaryRegistry::from_tree(tree);
        registry.refactor(tree)?;
        let graph = trace(tree);
        registry.recover(tree)?;
        StaticCollector::new(&registry).collect(&graph?)
    }

    fn resolve_boundary(&self, node: &GraphNode) -> Option<ModuleId> {
        let module = node.boundary.module()?;
        if self.registry.contains(module) {
            Some(module)
        } else {
            warn!(node = %node.name, %module, "boundary marker not in registry; treated as ordinary node");
            None
        }
    }

    /// Run the forward and backward simulation over `graph`.
    pub fn collect(&self, graph: &Graph) -> Result<StaticMemStats> {
        let nodes = graph.nodes();
        let mut state = nodes
            .iter()
            .map(|node| {
                Ok(NodeState {
                    ann: node.annotation()?,
                    boundary: self.resolve_boundary(node),
                    ..NodeState::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stats = StaticMemStats::default();
        let mut total = self.forward_pass(nodes, &mut state, &mut stats)?;
        self.backward_pass(nodes, &mut state, &mut stats, &mut total)?;

        debug!(
            forward = stats.forward.len(),
            backward = stats.backward.len(),
            peak = stats.peak(),
            "static memstats simulated"
        );
        Ok(stats)
    }

    fn forward_pass(
        &self,
        nodes: &[GraphNode],
        state: &mut [NodeState],
        stats: &mut StaticMemStats,
    ) -> Result<i64> {
        let mut total: i64 = 0;
        let mut samples = Vec::new();
        for (node, st) in nodes.iter().zip(state.iter_mut()) {
            total = add(total, st.ann.fwd_tmp, node)?;
            total = add(total, st.ann.fwd_out, node)?;
            if st.boundary.is_some() {
                samples.push(clamp(total));
                // the boundary's cost is attributed to the sample, not replayed
                st.ann.bwd_tmp = 0;
                st.ann.bwd_out = 0;
                debug!(node = %node.name, total, "forward boundary");
            }
        }
        samples.push(clamp(total));
        // the first marker is crossed before anything accumulates
        samples.remove(0);
        stats.forward = samples;
        Ok(total)
    }

    fn backward_pass(
        &self,
        nodes: &[GraphNode],
        state: &mut [NodeState],
        stats: &mut StaticMemStats,
        total: &mut i64,
    ) -> Result<()> {
        let mut peak = *total;
        for node in nodes.iter().rev() {
            let i = node.id.0;
            if node.retains_no_extra_gradient {
                continue;
            }

            // gradient seeds of the loss are supplied externally and live
            if node.op == OpKind::Output {
                for arg in &node.args {
                    *total = add(*total, state[arg.0].ann.fwd_out, node)?;
                }
            }

            let ann = state[i].ann;
            let out_bytes = node.output_tensor_bytes()?;
            *total = add(*total, ann.bwd_tmp, node)?;
            *total = add(*total, ann.bwd_out, node)?;
            peak = peak.max(*total);

            *total = sub(*total, ann.bwd_tmp, node)?;
            *total = sub(*total, ann.fwd_tmp, node)?;
            *total = sub(*total, out_bytes, node)?;

            for arg in &node.args {
                let producer = &mut state[arg.0];
                let fwd_out = producer.ann.fwd_out;
                if fwd_out > 0 && !producer.fwd_out_released {
                    *total = sub(*total, fwd_out, node)?;
                    producer.fwd_out_released = true;
                }
                // several gradients into one tensor accumulate into one buffer
                if producer.grad_computed {
                    *total = sub(*total, fwd_out, node)?;
                } else {
                    producer.grad_computed = true;
                }
            }

            if let Some(module) = state[i].boundary {
                stats.backward.push(clamp(peak));
                stats.backward_modules.push(module);
                debug!(node = %node.name, peak, "backward boundary");
                *total = add(*total, out_bytes, node)?;
                peak = *total;
            }

            if self.record_trace {
                stats.trace.push(LivenessStep { node: i, total: *total, peak });
            }
        }
        Ok(())
    }
}
