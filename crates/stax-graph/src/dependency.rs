use serde::{Deserialize, Serialize};

use crate::path::ModulePath;

/// One edge out of a module, tagged by what the target is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DependencyRef {
    /// Another code module of the project.
    RelativeModule { path: ModulePath },
    /// A bare package specifier, served from the externals bundle or left as-is.
    ExternalPackage { name: String },
    /// A stylesheet collected into the CSS bundle.
    CssAsset { path: ModulePath },
    /// A file copied into the asset directory under `unique_name`.
    #[serde(rename_all = "camelCase")]
    BinaryAsset {
        path: ModulePath,
        unique_name: String,
    },
}

impl DependencyRef {
    /// Graph key of the target, if the target is a project file.
    pub fn module_path(&self) -> Option<&ModulePath> {
        match self {
            DependencyRef::RelativeModule { path }
            | DependencyRef::CssAsset { path }
            | DependencyRef::BinaryAsset { path, .. } => Some(path),
            DependencyRef::ExternalPackage { .. } => None,
        }
    }

    /// The specifier text this dependency is known by.
    pub fn display_name(&self) -> &str {
        match self {
            DependencyRef::ExternalPackage { name } => name,
            other => other.module_path().map(ModulePath::as_str).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_tagged() {
        let asset = DependencyRef::BinaryAsset {
            path: ModulePath::new("b.png"),
            unique_name: "b-x1.png".into(),
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["kind"], "binaryAsset");
        assert_eq!(json["uniqueName"], "b-x1.png");

        let external = DependencyRef::ExternalPackage { name: "react".into() };
        assert!(external.module_path().is_none());
        assert_eq!(external.display_name(), "react");
    }
}
