//! Registry of module boundaries the collectors attribute samples to.

use super::tree::{ModuleId, ModuleTree};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// One parameterized submodule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleBoundaryEntry {
    pub module: ModuleId,
    pub local_name: String,
    pub qualified_path: String,
    pub parent: Option<ModuleId>,
}

/// Parameterized submodules in depth-first, children-before-parent order.
///
/// Modules that own no parameters directly are skipped.
#[derive(Debug, Clone, Default)]
pub struct ModuleBoundaryRegistry {
    entries: Vec<ModuleBoundaryEntry>,
    index: HashMap<ModuleId, usize>,
    /// Marker state saved by `refactor`, restored by `recover`.
    saved_markers: Option<Vec<(ModuleId, bool)>>,
}

impl ModuleBoundaryRegistry {
    /// Walk `tree` depth-first and register every module with direct parameters.
    pub fn from_tree(tree: &ModuleTree) -> Self {
        let mut registry = Self::default();
        if !tree.is_empty() {
            registry.register_recursively(tree, tree.root());
        }
        debug!(boundaries = registry.entries.len(), "module boundary registry built");
        registry
    }

    fn register_recursively(&mut self, tree: &ModuleTree, id: ModuleId) {
        let Some(module) = tree.get(id) else { return };
        for &child in &module.children {
            self.register_recursively(tree, child);
        }
        if module.params.is_empty() {
            return;
        }
        self.index.insert(id, self.entries.len());
        self.entries.push(ModuleBoundaryEntry {
            module: id,
            local_name: if module.parent.is_some() { module.name.clone() } else { String::new() },
            qualified_path: tree.qualified_path(id),
            parent: module.parent,
        });
    }

    pub fn entries(&self) -> &[ModuleBoundaryEntry] {
        &self.entries
    }

    pub fn get(&self, id: ModuleId) -> Option<&ModuleBoundaryEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_refactored(&self) -> bool {
        self.saved_markers.is_some()
    }

    /// Set the boundary marker on every registered module of `tree`.
    pub fn refactor(&mut self, tree: &mut ModuleTree) -> Result<()> {
        if self.saved_markers.is_some() {
            return Err(Error::phase("module tree is already refactored"));
        }
        let mut saved = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if let Some(module) = tree.get_mut(entry.module) {
                saved.push((entry.module, module.boundary_marker));
                module.boundary_marker = true;
            }
        }
        self.saved_markers = Some(saved);
        Ok(())
    }

    /// Restore the marker state saved by [`refactor`](Self::refactor).
    pub fn recover(&mut self, tree: &mut ModuleTree) -> Result<()> {
        let saved = self
            .saved_markers
            .take()
            .ok_or_else(|| Error::phase("recover called without a prior refactor"))?;
        for (id, marker) in saved {
            if let Some(module) = tree.get_mut(id) {
                module.boundary_marker = marker;
            }
        }
        Ok(())
    }
}
