//! Specifier resolution by extension probing.

use std::path::Path;

use stax_graph::{ModulePath, Runtime};

use crate::error::{BuildError, Result};

/// Suffixes tried, in order, after a specifier. The first one naming a regular
/// file wins. The order is fixed so resolution is the same on every platform.
pub const RESOLVE_SUFFIXES: &[&str] = &[
    "",
    ".ts",
    ".tsx",
    ".js",
    ".jsx",
    ".mjs",
    "/index.ts",
    "/index.tsx",
    "/index.js",
    "/index.jsx",
    "/index.mjs",
];

/// First existing file among `candidate` with each suffix of [`RESOLVE_SUFFIXES`].
pub async fn first_match(runtime: &dyn Runtime, root: &Path, candidate: &ModulePath) -> Option<ModulePath> {
    for suffix in RESOLVE_SUFFIXES {
        let candidate_path = if candidate.as_str().is_empty() {
            ModulePath::new(suffix.trim_start_matches('/'))
        } else {
            candidate.with_suffix(suffix)
        };
        if candidate_path.as_str().is_empty() {
            continue;
        }
        if runtime.is_file(&candidate_path.to_fs_path(root)).await {
            return Some(candidate_path);
        }
    }
    None
}

pub async fn resolve_entry(runtime: &dyn Runtime, root: &Path, entrypoint: &str) -> Result<ModulePath> {
    first_match(runtime, root, &ModulePath::new(entrypoint))
        .await
        .ok_or_else(|| BuildError::EntryNotFound(entrypoint.to_string()))
}

/// Resolve a relative `specifier` written in `importer`.
///
/// A miss is fatal for the build and names both the specifier and the importer.
pub async fn resolve_relative(
    runtime: &dyn Runtime,
    root: &Path,
    importer: &ModulePath,
    specifier: &str,
) -> Result<ModulePath> {
    first_match(runtime, root, &importer.join_specifier(specifier))
        .await
        .ok_or_else(|| BuildError::ModuleNotFound {
            specifier: specifier.to_string(),
            importer: importer.clone(),
        })
}

/// Find a package stylesheet such as `normalize.css/normalize.css` below one
/// of `package_dirs`. Only the literal path is checked, no `package.json`
/// lookup.
pub async fn resolve_package_stylesheet(
    runtime: &dyn Runtime,
    root: &Path,
    package_dirs: &[String],
    specifier: &str,
) -> Option<ModulePath> {
    if !specifier.ends_with(".css") {
        return None;
    }
    for dir in package_dirs {
        let candidate = root.join(dir).join(specifier);
        if runtime.is_file(&candidate).await {
            return Some(ModulePath::from_fs(root, &candidate));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use stax_graph::NativeRuntime;
    use tempfile::TempDir;

    async fn project(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let runtime = NativeRuntime;
        for file in files {
            let path = dir.path().join(file);
            runtime.create_dir(path.parent().unwrap(), true).await.unwrap();
            runtime.write_file(&path, b"").await.unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_suffix_order() {
        let dir = project(&["a.ts", "a.js", "lib/index.tsx", "b.png"]).await;
        let runtime = NativeRuntime;

        let a = first_match(&runtime, dir.path(), &ModulePath::new("a")).await;
        assert_eq!(a.unwrap().as_str(), "a.ts");

        let explicit = first_match(&runtime, dir.path(), &ModulePath::new("a.js")).await;
        assert_eq!(explicit.unwrap().as_str(), "a.js");

        let index = first_match(&runtime, dir.path(), &ModulePath::new("lib")).await;
        assert_eq!(index.unwrap().as_str(), "lib/index.tsx");

        let asset = first_match(&runtime, dir.path(), &ModulePath::new("b.png")).await;
        assert_eq!(asset.unwrap().as_str(), "b.png");
    }

    #[tokio::test]
    async fn test_directory_is_not_a_match() {
        let dir = project(&["lib/index.js"]).await;
        let found = first_match(&NativeRuntime, dir.path(), &ModulePath::new("lib")).await;
        assert_eq!(found.unwrap().as_str(), "lib/index.js");
    }

    #[tokio::test]
    async fn test_root_index() {
        let dir = project(&["index.ts", "lib/a.ts"]).await;
        let importer = ModulePath::new("lib/a.ts");
        let found = resolve_relative(&NativeRuntime, dir.path(), &importer, "..").await;
        assert_eq!(found.unwrap().as_str(), "index.ts");
    }

    #[tokio::test]
    async fn test_missing_relative_names_importer() {
        let dir = project(&["index.ts"]).await;
        let importer = ModulePath::new("index.ts");
        let err = resolve_relative(&NativeRuntime, dir.path(), &importer, "./missing")
            .await
            .unwrap_err();
        match err {
            BuildError::ModuleNotFound { specifier, importer } => {
                assert_eq!(specifier, "./missing");
                assert_eq!(importer.as_str(), "index.ts");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_package_stylesheet() {
        let dir = project(&["node_modules/normalize.css/normalize.css"]).await;
        let dirs = vec!["node_modules".to_string()];

        let found =
            resolve_package_stylesheet(&NativeRuntime, dir.path(), &dirs, "normalize.css/normalize.css")
                .await;
        assert_eq!(
            found.unwrap().as_str(),
            "node_modules/normalize.css/normalize.css"
        );

        assert!(
            resolve_package_stylesheet(&NativeRuntime, dir.path(), &dirs, "missing/x.css")
                .await
                .is_none()
        );
        assert!(
            resolve_package_stylesheet(&NativeRuntime, dir.path(), &dirs, "react")
                .await
                .is_none()
        );
    }
}
