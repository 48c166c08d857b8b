//! Command implementations. Each module exposes an `execute` function taking
//! the parsed arguments.

pub mod build;
pub mod graph;
pub mod schema;
pub mod watch;

pub use build::execute as build_execute;
pub use graph::execute as graph_execute;
pub use schema::execute as schema_execute;
pub use watch::execute as watch_execute;

use std::path::{Path, PathBuf};

use crate::cli::ProjectArgs;
use crate::config::{ConfigOverrides, StaxConfig};
use crate::error::{Result, ResultExt};

/// Absolute, symlink-free working directory (`--cwd` or the process's).
pub(crate) fn resolve_cwd(cwd: Option<&Path>) -> Result<PathBuf> {
    let base = std::env::current_dir()?;
    let dir = match cwd {
        Some(dir) => base.join(dir),
        None => base,
    };
    dir.canonicalize().with_path(&dir)
}

/// Working directory and configuration for a project command.
pub(crate) fn load_project_config(
    args: &ProjectArgs,
    overrides: ConfigOverrides,
) -> Result<(PathBuf, StaxConfig)> {
    let cwd = resolve_cwd(args.cwd.as_deref())?;
    let config = StaxConfig::load(&cwd, args.config.as_deref(), &overrides)?;
    Ok((cwd, config))
}
