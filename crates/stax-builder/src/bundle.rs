//! The "bundle an entrypoint to a directory" capability, used for the
//! externals bundle and the stylesheet bundle.

use async_trait::async_trait;
use rolldown::{BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat};
use stax_graph::Runtime;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BundleRequest {
    /// Entry module on disk.
    pub entry: PathBuf,
    /// Chunk name; the entry chunk is written as `<name>.js`.
    pub name: String,
    pub out_dir: PathBuf,
    /// Directory packages are resolved from.
    pub cwd: PathBuf,
}

/// Files written by one bundle call.
#[derive(Debug, Clone, Default)]
pub struct BundleReport {
    pub entry_chunk: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

impl BundleReport {
    /// First written file with the given extension.
    pub fn file_with_extension(&self, extension: &str) -> Option<&PathBuf> {
        self.files
            .iter()
            .find(|file| file.extension().is_some_and(|ext| ext == extension))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("bundling `{}` failed: {message}", .entry.display())]
pub struct BundleError {
    pub entry: PathBuf,
    pub message: String,
}

#[async_trait]
pub trait EntryBundler: Send + Sync + std::fmt::Debug {
    async fn bundle(&self, request: BundleRequest) -> Result<BundleReport, BundleError>;
}

/// Bundles with rolldown and writes every emitted chunk and asset through
/// the runtime.
#[derive(Debug, Clone)]
pub struct RolldownBundler {
    runtime: Arc<dyn Runtime>,
}

impl RolldownBundler {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self { runtime }
    }
}

/// Output names come from rolldown; refuse anything that would land outside
/// the output directory.
fn output_path(out_dir: &Path, filename: &str) -> Option<PathBuf> {
    let relative = Path::new(filename);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    (!escapes).then(|| out_dir.join(relative))
}

#[async_trait]
impl EntryBundler for RolldownBundler {
    async fn bundle(&self, request: BundleRequest) -> Result<BundleReport, BundleError> {
        let fail = |message: String| BundleError {
            entry: request.entry.clone(),
            message,
        };

        let options = BundlerOptions {
            input: Some(vec![InputItem {
                name: Some(request.name.clone()),
                import: request.entry.to_string_lossy().into_owned(),
            }]),
            cwd: Some(request.cwd.clone()),
            format: Some(OutputFormat::Esm),
            ..Default::default()
        };

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(options)
            .build()
            .map_err(|e| fail(format!("{:?}", e)))?;
        let output = bundler
            .generate()
            .await
            .map_err(|e| fail(format!("{:?}", e)))?;

        self.runtime
            .create_dir(&request.out_dir, true)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let mut report = BundleReport::default();
        for item in &output.assets {
            let (filename, bytes, is_entry) = match item {
                rolldown_common::Output::Chunk(chunk) => {
                    (chunk.filename.as_str(), chunk.code.as_bytes(), chunk.is_entry)
                }
                rolldown_common::Output::Asset(asset) => {
                    (asset.filename.as_str(), asset.source.as_bytes(), false)
                }
            };
            let target = output_path(&request.out_dir, filename)
                .ok_or_else(|| fail(format!("refusing to write outside output dir: {}", filename)))?;
            if let Some(parent) = target.parent() {
                self.runtime
                    .create_dir(parent, true)
                    .await
                    .map_err(|e| fail(e.to_string()))?;
            }
            self.runtime
                .write_file(&target, bytes)
                .await
                .map_err(|e| fail(e.to_string()))?;
            tracing::debug!(file = %target.display(), "wrote bundle output");
            if is_entry && report.entry_chunk.is_none() {
                report.entry_chunk = Some(target.clone());
            }
            report.files.push(target);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_rejects_traversal() {
        let out = Path::new("/out");
        assert_eq!(output_path(out, "a.js"), Some(PathBuf::from("/out/a.js")));
        assert_eq!(
            output_path(out, "chunks/b.js"),
            Some(PathBuf::from("/out/chunks/b.js"))
        );
        assert!(output_path(out, "../escape.js").is_none());
        assert!(output_path(out, "/abs.js").is_none());
    }

    #[test]
    fn test_report_lookup_by_extension() {
        let report = BundleReport {
            entry_chunk: Some(PathBuf::from("/out/s.js")),
            files: vec![PathBuf::from("/out/s.js"), PathBuf::from("/out/s.css")],
        };
        assert_eq!(
            report.file_with_extension("css"),
            Some(&PathBuf::from("/out/s.css"))
        );
        assert!(report.file_with_extension("map").is_none());
    }
}
