//! Incremental graph construction, the way a tracer emits nodes.

use super::node::{BoundaryMarker, Graph, GraphNode, MemoryAnnotation, NodeId, OpKind, OutputDesc};
use crate::error::{Error, Result};
use crate::module::{ModuleId, ModuleTree};

/// Appends nodes in topological order.
///
/// Calls into modules whose boundary marker is set in the tree are preceded
/// by a zero-footprint marker node tagged `Boundary(module)` that passes its
/// inputs through; the module call then consumes the marker.
#[derive(Debug)]
pub struct GraphBuilder<'t> {
    tree: &'t ModuleTree,
    nodes: Vec<GraphNode>,
}

impl<'t> GraphBuilder<'t> {
    pub fn new(tree: &'t ModuleTree) -> Self {
        Self { tree, nodes: Vec::new() }
    }

    /// Append a raw node. `memory: None` leaves it unannotated.
    pub fn push_node(
        &mut self,
        op: OpKind,
        name: impl Into<String>,
        args: &[NodeId],
        memory: Option<MemoryAnnotation>,
        outputs: Vec<OutputDesc>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            id,
            name: name.into(),
            op,
            target: None,
            args: args.to_vec(),
            memory,
            outputs,
            boundary: BoundaryMarker::Ordinary,
            retains_no_extra_gradient: false,
        });
        id
    }

    pub fn placeholder(
        &mut self,
        name: impl Into<String>,
        memory: MemoryAnnotation,
        outputs: Vec<OutputDesc>,
    ) -> NodeId {
        self.push_node(OpKind::Placeholder, name, &[], Some(memory), outputs)
    }

    pub fn call_function(
        &mut self,
        name: impl Into<String>,
        args: &[NodeId],
        memory: MemoryAnnotation,
        outputs: Vec<OutputDesc>,
    ) -> NodeId {
        self.push_node(OpKind::CallFunction, name, args, Some(memory), outputs)
    }

    /// Append a call into `module`, preceded by a boundary marker when the
    /// module is marked in the tree.
    pub fn call_module(
        &mut self,
        module: ModuleId,
        args: &[NodeId],
        memory: MemoryAnnotation,
        outputs: Vec<OutputDesc>,
    ) -> Result<NodeId> {
        if self.tree.get(module).is_none() {
            return Err(Error::graph_metadata(
                format!("call_module({module})"),
                "target is not in the module tree",
            ));
        }
        let path = self.tree.qualified_path(module);
        let mut call_args = args.to_vec();
        if self.tree.is_marked(module) {
            let passthrough: Vec<OutputDesc> = args
                .iter()
                .filter_map(|a| self.nodes.get(a.0))
                .flat_map(|n| n.outputs.iter().cloned())
                .collect();
            let marker = self.push_node(
                OpKind::CallModule,
                format!("{path}_marker"),
                args,
                Some(MemoryAnnotation::default()),
                passthrough,
            );
            let node = &mut self.nodes[marker.0];
            node.target = Some(module);
            node.boundary = BoundaryMarker::Boundary(module);
            call_args = vec![marker];
        }
        let id = self.push_node(OpKind::CallModule, path, &call_args, Some(memory), outputs);
        self.nodes[id.0].target = Some(module);
        Ok(id)
    }

    /// Flag a node whose backward keeps no extra gradient buffer.
    pub fn set_retains_no_extra_gradient(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.retains_no_extra_gradient = true;
        }
    }

    pub fn output(&mut self, args: &[NodeId]) -> NodeId {
        self.push_node(OpKind::Output, "output", args, Some(MemoryAnnotation::default()), vec![
            OutputDesc::Other,
        ])
    }

    pub fn build(self) -> Result<Graph> {
        Graph::new(self.nodes)
    }
}
