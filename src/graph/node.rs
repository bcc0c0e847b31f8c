//! Graph node types.

use crate::error::{Error, Result};
use crate::module::{ModuleId, ModuleSpec, ModuleTree};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node in topological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Placeholder,
    GetAttr,
    CallFunction,
    CallMethod,
    CallModule,
    Output,
}

/// Whether a node opens a module boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<ModuleId>", into = "Option<ModuleId>")]
pub enum BoundaryMarker {
    #[default]
    Ordinary,
    Boundary(ModuleId),
}

impl BoundaryMarker {
    pub fn module(self) -> Option<ModuleId> {
        match self {
            BoundaryMarker::Ordinary => None,
            BoundaryMarker::Boundary(id) => Some(id),
        }
    }
}

impl From<Option<ModuleId>> for BoundaryMarker {
    fn from(value: Option<ModuleId>) -> Self {
        value.map_or(BoundaryMarker::Ordinary, BoundaryMarker::Boundary)
    }
}

impl From<BoundaryMarker> for Option<ModuleId> {
    fn from(value: BoundaryMarker) -> Self {
        value.module()
    }
}

/// Per-node memory footprint in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryAnnotation {
    #[serde(default)]
    pub fwd_tmp: u64,
    #[serde(default)]
    pub fwd_out: u64,
    #[serde(default)]
    pub bwd_tmp: u64,
    #[serde(default)]
    pub bwd_out: u64,
}

impl MemoryAnnotation {
    /// Node that only produces an output of `bytes`.
    pub fn output_only(bytes: u64) -> Self {
        Self { fwd_out: bytes, ..Self::default() }
    }
}

/// Descriptor of one forward output value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputDesc {
    Tensor { shape: Vec<u64>, element_size: u64 },
    /// Non-tensor value (shape tuples, scalars, `None`).
    Other,
}

impl OutputDesc {
    pub fn tensor(shape: &[u64], element_size: u64) -> Self {
        OutputDesc::Tensor { shape: shape.to_vec(), element_size }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, OutputDesc::Tensor { .. })
    }

    /// Storage bytes; zero for non-tensor values, `None` on overflow.
    pub fn bytes(&self) -> Option<u64> {
        match self {
            OutputDesc::Tensor { shape, element_size } => {
                shape.iter().try_fold(*element_size, |acc, &dim| acc.checked_mul(dim))
            }
            OutputDesc::Other => Some(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub name: String,
    pub op: OpKind,

    /// Called module for `call_module` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ModuleId>,

    /// Producer nodes, in argument order.
    #[serde(default)]
    pub args: Vec<NodeId>,

    /// `None` when the tracer did not annotate the node.
    #[serde(default)]
    pub memory: Option<MemoryAnnotation>,

    #[serde(default)]
    pub outputs: Vec<OutputDesc>,

    #[serde(default)]
    pub boundary: BoundaryMarker,

    /// Backward keeps no gradient buffer beyond its inputs'.
    #[serde(default)]
    pub retains_no_extra_gradient: bool,
}

impl GraphNode {
    /// Size annotations, or a metadata error naming the node.
    pub fn annotation(&self) -> Result<MemoryAnnotation> {
        self.memory
            .ok_or_else(|| Error::graph_metadata(&self.name, "missing memory annotation"))
    }

    /// Sum of the bytes of every tensor output.
    pub fn output_tensor_bytes(&self) -> Result<u64> {
        self.outputs
            .iter()
            .filter(|o| o.is_tensor())
            .try_fold(0u64, |acc, o| o.bytes().and_then(|b| acc.checked_add(b)))
            .ok_or_else(|| Error::graph_metadata(&self.name, "byte size overflows"))
    }
}

/// Nodes in topological order; `nodes[i].id == NodeId(i)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Graph {
    nodes: Vec<GraphNode>,
}

impl Graph {
    /// Check ids and topological order, then wrap `nodes`.
    pub fn new(nodes: Vec<GraphNode>) -> Result<Self> {
        for (i, node) in nodes.iter().enumerate() {
            if node.id != NodeId(i) {
                return Err(Error::graph_metadata(
                    &node.name,
                    format!("id {} does not match position {i}", node.id),
                ));
            }
            if let Some(arg) = node.args.iter().find(|a| a.0 >= i) {
                return Err(Error::graph_metadata(
                    &node.name,
                    format!("argument {arg} is not emitted before the node"),
                ));
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes carrying a boundary marker, in forward order.
    pub fn boundaries(&self) -> impl Iterator<Item = (NodeId, ModuleId)> + '_ {
        self.nodes.iter().filter_map(|n| n.boundary.module().map(|m| (n.id, m)))
    }
}

/// Serialized tracer output: module hierarchy plus annotated nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub modules: ModuleSpec,
    pub nodes: Vec<GraphNode>,
}

impl GraphSpec {
    /// Flatten the module hierarchy and validate the node list.
    pub fn into_parts(self) -> Result<(ModuleTree, Graph)> {
        let tree = ModuleTree::from_spec(&self.modules);
        if let Some(node) =
            self.nodes.iter().find(|n| n.target.is_some_and(|t| tree.get(t).is_none()))
        {
            return Err(Error::graph_metadata(&node.name, "call target is not in the module tree"));
        }
        Ok((tree, Graph::new(self.nodes)?))
    }
}
