//! Build-wide collections filled while walking the graph and consumed by the
//! artifact pass.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::path::ModulePath;

/// Distinct external package specifiers, in first-discovery order.
///
/// The position of a package is its slot in the externals bundle
/// (`externalModule{index}`), so entries are never reordered or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalRegistry {
    names: IndexSet<String>,
}

impl ExternalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` and return its slot index.
    pub fn register(&mut self, name: &str) -> usize {
        match self.names.get_index_of(name) {
            Some(index) => index,
            None => self.names.insert_full(name.to_string()).0,
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Distinct stylesheets, in first-discovery order (cascade order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CssFileList {
    files: IndexSet<ModulePath>,
}

impl CssFileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless already listed. Returns true if it was new.
    pub fn push(&mut self, path: ModulePath) -> bool {
        self.files.insert(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModulePath> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A binary asset scheduled for copying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub asset_path: ModulePath,
    pub unique_name: String,
}

/// Assets keyed by source path, so one file imported from several modules is
/// copied once under one name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFiles {
    files: IndexMap<ModulePath, AssetFile>,
}

impl AssetFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &ModulePath) -> Option<&AssetFile> {
        self.files.get(path)
    }

    /// Return the asset for `path`, creating it with `make_name` on first sight.
    pub fn get_or_insert_with(
        &mut self,
        path: &ModulePath,
        make_name: impl FnOnce() -> String,
    ) -> &AssetFile {
        self.files
            .entry(path.clone())
            .or_insert_with(|| AssetFile {
                asset_path: path.clone(),
                unique_name: make_name(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Everything collected alongside the graph during one build.
#[derive(Debug, Clone, Default)]
pub struct BuildAccumulators {
    pub externals: ExternalRegistry,
    pub css_files: CssFileList,
    pub assets: AssetFiles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_slots_are_stable() {
        let mut registry = ExternalRegistry::new();
        assert_eq!(registry.register("react"), 0);
        assert_eq!(registry.register("lodash"), 1);
        assert_eq!(registry.register("react"), 0);
        assert_eq!(registry.iter().collect::<Vec<_>>(), vec!["react", "lodash"]);
    }

    #[test]
    fn test_css_keeps_first_discovery_order() {
        let mut css = CssFileList::new();
        assert!(css.push(ModulePath::new("b.css")));
        assert!(css.push(ModulePath::new("a.css")));
        assert!(!css.push(ModulePath::new("b.css")));

        let order: Vec<_> = css.iter().map(ModulePath::as_str).collect();
        assert_eq!(order, vec!["b.css", "a.css"]);
    }

    #[test]
    fn test_asset_named_once() {
        let mut assets = AssetFiles::new();
        let path = ModulePath::new("logo.png");
        let mut calls = 0;

        let first = assets
            .get_or_insert_with(&path, || {
                calls += 1;
                "logo-1.png".into()
            })
            .clone();
        let second = assets
            .get_or_insert_with(&path, || {
                calls += 1;
                "logo-2.png".into()
            })
            .clone();

        assert_eq!(first, second);
        assert_eq!(calls, 1);
        assert_eq!(assets.len(), 1);
    }
}
