//! Shared test utilities for stax-cli tests

#![allow(dead_code, clippy::disallowed_methods)]

use async_trait::async_trait;
use stax_builder::stax_graph::{self, FileMetadata, Runtime, RuntimeError, RuntimeResult};
use stax_builder::{BuildServices, OxcCompiler, RolldownBundler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

/// Create a project with the given `(path, contents)` files.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (path, contents) in files {
        write(dir.path(), path, contents);
    }
    dir
}

pub fn write(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    std::fs::create_dir_all(path.parent().unwrap()).expect("create dir");
    std::fs::write(&path, contents).expect("write file");
}

pub fn read(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

/// Canonical root, so paths compare equal to what the watcher reports.
pub fn root(dir: &TempDir) -> PathBuf {
    dir.path().canonicalize().expect("canonical temp dir")
}

/// A server with one helper module and a web app with one component.
pub fn fullstack() -> TempDir {
    project(&[
        (
            "server/index.ts",
            "import { greet } from \"./greet\";\nconsole.log(greet(\"stax\"));\n",
        ),
        (
            "server/greet.ts",
            "export function greet(name: string): string {\n  return `hello ${name}`;\n}\n",
        ),
        (
            "webapp/index.ts",
            "import { mount } from \"./app\";\nmount(document.body);\n",
        ),
        (
            "webapp/app.ts",
            "export const mount = (el: HTMLElement): void => {\n  el.textContent = \"hi\";\n};\n",
        ),
    ])
}

/// Native filesystem whose staging swaps can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyRuntime {
    inner: stax_graph::NativeRuntime,
    pub fail_swaps: AtomicBool,
}

#[async_trait]
impl Runtime for FlakyRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        self.inner.write_file(path, content).await
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        self.inner.metadata(path).await
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        self.inner.create_dir(path, recursive).await
    }

    async fn remove_file(&self, path: &Path) -> RuntimeResult<()> {
        self.inner.remove_file(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> RuntimeResult<()> {
        self.inner.remove_dir_all(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> RuntimeResult<()> {
        let staged = from.extension().is_some_and(|ext| ext == "staging");
        if staged && self.fail_swaps.load(Ordering::SeqCst) {
            return Err(RuntimeError::Io(format!("cannot rename {}", from.display())));
        }
        self.inner.rename(from, to).await
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> RuntimeResult<()> {
        self.inner.copy_file(from, to).await
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        self.inner.read_dir(path).await
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        self.inner.get_cwd()
    }
}

/// Native services on top of `runtime`.
pub fn services(runtime: Arc<FlakyRuntime>) -> BuildServices {
    let runtime: Arc<dyn Runtime> = runtime;
    BuildServices::new(
        Arc::clone(&runtime),
        Arc::new(OxcCompiler),
        Arc::new(RolldownBundler::new(runtime)),
    )
}

/// Whether a process with `pid` exists.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
