use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dependency::DependencyRef;
use crate::node::ModuleNode;
use crate::path::ModulePath;

/// The flat tree: every module, stylesheet and asset reached by a build,
/// keyed by [`ModulePath`], in discovery order.
///
/// Nodes are created as placeholders the moment a path is discovered, before
/// the module itself is scanned, so every path stored in some node's
/// `imports` or `parents` is always a key of the same graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleGraph {
    nodes: IndexMap<ModulePath, ModuleNode>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path`, inserting an empty placeholder node.
    ///
    /// Returns true if the path was not yet part of the graph, i.e. the
    /// caller is the one responsible for processing it.
    pub fn claim(&mut self, path: &ModulePath) -> bool {
        if self.nodes.contains_key(path) {
            return false;
        }
        self.nodes.insert(path.clone(), ModuleNode::new());
        true
    }

    /// Register an edge from `from` to `dependency`.
    ///
    /// Both endpoints are claimed if needed. The dependency is recorded once in
    /// `from.imports`, and `from` is recorded once in the target's `parents`.
    pub fn add_dependency(&mut self, from: &ModulePath, dependency: DependencyRef) {
        self.claim(from);

        if let Some(target) = dependency.module_path() {
            self.claim(target);
            if let Some(node) = self.nodes.get_mut(target) {
                node.add_parent(from);
            }
        }

        if let Some(node) = self.nodes.get_mut(from) {
            node.imports.insert(dependency);
        }
    }

    pub fn set_asset_name(&mut self, path: &ModulePath, name: impl Into<String>) {
        self.claim(path);
        if let Some(node) = self.nodes.get_mut(path) {
            node.asset_name = Some(name.into());
        }
    }

    pub fn set_out(&mut self, path: &ModulePath, out: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.out = Some(out.into());
        }
    }

    pub fn get(&self, path: &ModulePath) -> Option<&ModuleNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &ModulePath) -> bool {
        self.nodes.contains_key(path)
    }

    /// Same as [`contains`](Self::contains) but accepts a raw string key.
    pub fn contains_key(&self, path: &str) -> bool {
        self.nodes.contains_key(&ModulePath::new(path))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &ModulePath> {
        self.nodes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModulePath, &ModuleNode)> {
        self.nodes.iter()
    }

    /// Paths referenced from `imports` or `parents` that have no node.
    ///
    /// Always empty for a graph built through [`add_dependency`](Self::add_dependency);
    /// exposed so callers loading a manifest from disk can check it.
    pub fn dangling_references(&self) -> Vec<ModulePath> {
        let mut dangling = Vec::new();
        for node in self.nodes.values() {
            let referenced = node
                .imports
                .iter()
                .filter_map(DependencyRef::module_path)
                .chain(node.parents.iter());
            for path in referenced {
                if !self.nodes.contains_key(path) && !dangling.contains(path) {
                    dangling.push(path.clone());
                }
            }
        }
        dangling
    }

    /// Serialize the flat tree as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
