//! Shared test utilities for stax-builder tests
//!
//! The fakes stand in for the compiler and the bundler so graph semantics can
//! be checked without oxc or rolldown in the loop.

#![allow(dead_code, clippy::disallowed_methods)]

use async_trait::async_trait;
use parking_lot::Mutex;
use stax_builder::stax_graph::{ModulePath, NativeRuntime, Runtime};
use stax_builder::{
    BuildServices, BundleError, BundleReport, BundleRequest, CompileError, CompileUnit,
    CompiledModule, EntryBundler, ModuleCompiler,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Create a project with the given `(path, contents)` files.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (path, contents) in files {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).expect("create dir");
        std::fs::write(&path, contents).expect("write file");
    }
    dir
}

pub fn read(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

/// Names of entries directly inside `dir` that start with `.stax-`.
pub fn intermediates(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".stax-"))
        .collect()
}

/// Passes sources through unchanged and records every module it sees.
#[derive(Debug, Default)]
pub struct RecordingCompiler {
    pub compiled: Mutex<Vec<ModulePath>>,
    pub fail_on: Option<String>,
}

impl RecordingCompiler {
    pub fn failing_on(path: &str) -> Self {
        Self {
            fail_on: Some(path.to_string()),
            ..Self::default()
        }
    }

    pub fn count(&self, path: &str) -> usize {
        self.compiled
            .lock()
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }
}

#[async_trait]
impl ModuleCompiler for RecordingCompiler {
    async fn compile(&self, unit: CompileUnit) -> Result<CompiledModule, CompileError> {
        self.compiled.lock().push(unit.path.clone());
        if self.fail_on.as_deref() == Some(unit.path.as_str()) {
            return Err(CompileError {
                path: unit.path,
                diagnostics: vec!["Unexpected token".to_string()],
            });
        }
        Ok(CompiledModule {
            path: unit.path,
            code: unit.source,
        })
    }
}

/// Writes the aggregator source as `<name>.js` and concatenates every
/// `import "<x>.css";` line's file into `<name>.css`.
#[derive(Debug, Default)]
pub struct FakeBundler {
    pub requests: Mutex<Vec<BundleRequest>>,
    /// Aggregator sources, in call order.
    pub sources: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeBundler {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EntryBundler for FakeBundler {
    async fn bundle(&self, request: BundleRequest) -> Result<BundleReport, BundleError> {
        self.requests.lock().push(request.clone());
        let fail = |message: String| BundleError {
            entry: request.entry.clone(),
            message,
        };
        if self.fail {
            return Err(fail("bundler failed on purpose".to_string()));
        }

        let source = std::fs::read_to_string(&request.entry).map_err(|e| fail(e.to_string()))?;
        self.sources.lock().push(source.clone());
        std::fs::create_dir_all(&request.out_dir).map_err(|e| fail(e.to_string()))?;

        let js = request.out_dir.join(format!("{}.js", request.name));
        std::fs::write(&js, &source).map_err(|e| fail(e.to_string()))?;
        let mut files = vec![js.clone()];

        let mut css = String::new();
        for line in source.lines() {
            let specifier = line
                .strip_prefix("import \"")
                .and_then(|rest| rest.strip_suffix("\";"));
            if let Some(specifier) = specifier.filter(|s| s.ends_with(".css")) {
                let contents = std::fs::read_to_string(request.cwd.join(specifier))
                    .map_err(|e| fail(e.to_string()))?;
                css.push_str(&contents);
                css.push('\n');
            }
        }
        if !css.is_empty() {
            let stylesheet = request.out_dir.join(format!("{}.css", request.name));
            std::fs::write(&stylesheet, css).map_err(|e| fail(e.to_string()))?;
            files.push(stylesheet);
        }

        Ok(BundleReport {
            entry_chunk: Some(js),
            files,
        })
    }
}

pub struct Harness {
    pub compiler: Arc<RecordingCompiler>,
    pub bundler: Arc<FakeBundler>,
    pub services: BuildServices,
}

pub fn harness() -> Harness {
    harness_with(RecordingCompiler::default(), FakeBundler::default())
}

pub fn harness_with(compiler: RecordingCompiler, bundler: FakeBundler) -> Harness {
    let compiler = Arc::new(compiler);
    let bundler = Arc::new(bundler);
    let runtime: Arc<dyn Runtime> = Arc::new(NativeRuntime);
    let services = BuildServices::new(
        runtime,
        Arc::clone(&compiler) as Arc<dyn ModuleCompiler>,
        Arc::clone(&bundler) as Arc<dyn EntryBundler>,
    );
    Harness {
        compiler,
        bundler,
        services,
    }
}

pub fn out_dir(project: &TempDir) -> PathBuf {
    project.path().join("dist")
}
