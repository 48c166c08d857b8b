//! Post-walk artifact pass: externals bundle, stylesheet bundle, asset copies.
//!
//! Both bundles go through a generated intermediate module that is written
//! next to the project sources (so packages resolve from the project) and is
//! removed again whether bundling succeeded or not.

use std::future::Future;
use std::path::{Path, PathBuf};

use stax_graph::{AssetFiles, CssFileList, ExternalRegistry, relative_specifier};

use crate::build::BuildServices;
use crate::bundle::{BundleError, BundleReport, BundleRequest};
use crate::error::{BuildError, Result};

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

fn intermediate_name(kind: &str) -> String {
    format!(".stax-{}-{}", kind, uuid::Uuid::new_v4().simple())
}

/// Write `source` to a fresh intermediate module under `root`, run `bundle`
/// on it and remove the file afterwards, on every path.
async fn with_intermediate<F, Fut>(
    services: &BuildServices,
    root: &Path,
    name: &str,
    source: &str,
    bundle: F,
) -> Result<BundleReport>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<BundleReport>>,
{
    let intermediate = root.join(format!("{}.js", name));
    services
        .runtime
        .write_file(&intermediate, source.as_bytes())
        .await?;

    let result = bundle(intermediate.clone()).await;

    if let Err(err) = services.runtime.remove_file(&intermediate).await {
        tracing::warn!(file = %intermediate.display(), "failed to remove intermediate: {}", err);
    }
    result
}

/// Source of the aggregator module: package `i` is re-exported as
/// `externalModule{i}`, matching the slot assigned during the walk.
pub fn externals_source(externals: &ExternalRegistry) -> String {
    externals
        .iter()
        .enumerate()
        .map(|(index, name)| format!("export * as externalModule{} from {};\n", index, quote(name)))
        .collect()
}

/// Source of the stylesheet aggregator, importing every file in discovery order.
pub fn stylesheets_source(root: &Path, css_files: &CssFileList) -> String {
    css_files
        .iter()
        .map(|css| {
            let specifier = if Path::new(css.as_str()).is_absolute() {
                css.to_fs_path(root).to_string_lossy().replace('\\', "/")
            } else {
                relative_specifier("", css.as_str())
            };
            format!("import {};\n", quote(&specifier))
        })
        .collect()
}

/// Bundle every registered package into `out_dir/out_name`.
pub async fn bundle_external_modules(
    services: &BuildServices,
    root: &Path,
    externals: &ExternalRegistry,
    out_dir: &Path,
    out_name: &str,
) -> Result<PathBuf> {
    let name = intermediate_name("externals");
    let chunk_name = Path::new(out_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "externals".to_string());
    let source = externals_source(externals);

    let report = with_intermediate(services, root, &name, &source, |entry| async move {
        let request = BundleRequest {
            entry,
            name: chunk_name,
            out_dir: out_dir.to_path_buf(),
            cwd: root.to_path_buf(),
        };
        Ok(services.bundler.bundle(request).await?)
    })
    .await?;

    let target = out_dir.join(out_name);
    match report.entry_chunk {
        Some(chunk) if chunk != target => services.runtime.rename(&chunk, &target).await?,
        Some(_) => {}
        None => {
            return Err(BuildError::Bundle(BundleError {
                entry: target,
                message: "no entry chunk was emitted".to_string(),
            }));
        }
    }
    tracing::info!(packages = externals.len(), file = %target.display(), "bundled externals");
    Ok(target)
}

/// Bundle every stylesheet, in discovery order, into `out_dir/out_name`.
///
/// The JS chunk the bundler emits for the aggregator is removed; files the
/// stylesheets reference (fonts, images) stay next to the output.
pub async fn bundle_css_files(
    services: &BuildServices,
    root: &Path,
    css_files: &CssFileList,
    out_dir: &Path,
    out_name: &str,
) -> Result<PathBuf> {
    let name = intermediate_name("styles");
    let source = stylesheets_source(root, css_files);
    let chunk_name = name.clone();

    let report = with_intermediate(services, root, &name, &source, |entry| async move {
        let request = BundleRequest {
            entry,
            name: chunk_name,
            out_dir: out_dir.to_path_buf(),
            cwd: root.to_path_buf(),
        };
        Ok(services.bundler.bundle(request).await?)
    })
    .await?;

    let stylesheet = report.file_with_extension("css").cloned();
    for file in &report.files {
        if file.extension().is_some_and(|ext| ext == "js") {
            services.runtime.remove_file(file).await?;
        }
    }

    let stylesheet = stylesheet.ok_or(BuildError::MissingStylesheet {
        count: css_files.len(),
    })?;
    let target = out_dir.join(out_name);
    services.runtime.rename(&stylesheet, &target).await?;
    tracing::info!(stylesheets = css_files.len(), file = %target.display(), "bundled stylesheets");
    Ok(target)
}

/// Copy every asset to `asset_dir/<unique name>`. Returns the copies in
/// asset order.
pub async fn copy_assets(
    services: &BuildServices,
    root: &Path,
    assets: &AssetFiles,
    asset_dir: &Path,
) -> Result<Vec<PathBuf>> {
    if assets.is_empty() {
        return Ok(Vec::new());
    }
    services.runtime.create_dir(asset_dir, true).await?;

    let mut copied = Vec::with_capacity(assets.len());
    for asset in assets.iter() {
        let target = asset_dir.join(&asset.unique_name);
        services
            .runtime
            .copy_file(&asset.asset_path.to_fs_path(root), &target)
            .await?;
        copied.push(target);
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stax_graph::ModulePath;

    #[test]
    fn test_externals_source_uses_slots() {
        let mut externals = ExternalRegistry::new();
        externals.register("react");
        externals.register("@scope/pkg");
        assert_eq!(
            externals_source(&externals),
            "export * as externalModule0 from \"react\";\n\
             export * as externalModule1 from \"@scope/pkg\";\n"
        );
    }

    #[test]
    fn test_stylesheets_source_keeps_order() {
        let mut css = CssFileList::new();
        css.push(ModulePath::new("styles/b.css"));
        css.push(ModulePath::new("a.css"));
        css.push(ModulePath::new("node_modules/normalize.css/normalize.css"));
        assert_eq!(
            stylesheets_source(Path::new("/project"), &css),
            "import \"./styles/b.css\";\n\
             import \"./a.css\";\n\
             import \"./node_modules/normalize.css/normalize.css\";\n"
        );
    }
}
