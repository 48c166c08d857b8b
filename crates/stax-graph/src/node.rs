use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::dependency::DependencyRef;
use crate::path::ModulePath;

/// A single entry of the flat tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModuleNode {
    /// Distinct dependencies, in first-registration order.
    pub imports: IndexSet<DependencyRef>,
    /// Importers of this module, in first-registration order.
    pub parents: Vec<ModulePath>,
    /// Deduplicated output name, only set on binary assets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_name: Option<String>,
    /// Final on-disk location once written or copied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<String>,
}

impl ModuleNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `parent` as an importer. Returns false if it already was one.
    pub fn add_parent(&mut self, parent: &ModulePath) -> bool {
        if self.parents.contains(parent) {
            return false;
        }
        self.parents.push(parent.clone());
        true
    }

    pub fn is_asset(&self) -> bool {
        self.asset_name.is_some()
    }
}
