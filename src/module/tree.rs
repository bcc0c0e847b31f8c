//! Arena representation of a model's module hierarchy.

use crate::hooks::ParamRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a module in its [`ModuleTree`] (pre-order position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub usize);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// Nested, serializable description of a module and its children.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,

    /// Parameters owned directly by this module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ModuleSpec>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_param(mut self, param: ParamRef) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_child(mut self, child: ModuleSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// One module in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub params: Vec<ParamRef>,
    pub children: Vec<ModuleId>,
    pub parent: Option<ModuleId>,
    /// Set while the module is wrapped as a boundary for tracing.
    pub boundary_marker: bool,
}

/// Module hierarchy stored as an arena; the root is always `ModuleId(0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleTree {
    modules: Vec<Module>,
}

impl ModuleTree {
    /// Flatten `spec` in pre-order.
    pub fn from_spec(spec: &ModuleSpec) -> Self {
        let mut tree = Self { modules: Vec::new() };
        tree.insert(spec, None);
        tree
    }

    fn insert(&mut self, spec: &ModuleSpec, parent: Option<ModuleId>) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(Module {
            name: spec.name.clone(),
            params: spec.params.clone(),
            children: Vec::with_capacity(spec.children.len()),
            parent,
            boundary_marker: false,
        });
        for child in &spec.children {
            let child_id = self.insert(child, Some(id));
            self.modules[id.0].children.push(child_id);
        }
        id
    }

    pub fn root(&self) -> ModuleId {
        ModuleId(0)
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate().map(|(i, m)| (ModuleId(i), m))
    }

    pub fn is_marked(&self, id: ModuleId) -> bool {
        self.get(id).is_some_and(|m| m.boundary_marker)
    }

    /// Dotted path from the root's children down to `id` (empty for the root).
    pub fn qualified_path(&self, id: ModuleId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let Some(module) = self.get(cur) else { break };
            if module.parent.is_some() {
                parts.push(module.name.as_str());
            }
            current = module.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Total bytes of every parameter in the tree.
    pub fn parameter_bytes(&self) -> u64 {
        self.modules
            .iter()
            .flat_map(|m| &m.params)
            .map(ParamRef::bytes)
            .fold(0, u64::saturating_add)
    }

    /// Every parameter in the tree, in module pre-order.
    pub fn parameters(&self) -> Vec<ParamRef> {
        self.modules.iter().flat_map(|m| m.params.iter().copied()).collect()
    }
}
