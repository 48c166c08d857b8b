//! Error types for the stax CLI.
//!
//! [`CliError`] is what every command returns. Builder failures are carried
//! as [`stax_builder::BuildError`] so their miette diagnostics (codes, help)
//! survive up to `main`; config problems get their own [`ConfigError`] with
//! a hint for the user.
//!
//! ```rust,no_run
//! use stax_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_template(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("templates live next to the web-app entrypoint")
//! }
//! ```

mod report;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resolution, compile and bundling failures from the builder.
    #[error("Build error: {0}")]
    Build(#[from] stax_builder::BuildError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Spawning or stopping the server child process failed.
    #[error("Server process error: {0}")]
    Process(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl From<stax_graph::RuntimeError> for CliError {
    fn from(err: stax_graph::RuntimeError) -> Self {
        CliError::Build(err.into())
    }
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}\n\nHint: Create a stax.config.json file or pass --config <path>", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid JSON in config file: {0}\n\nHint: Use a JSON validator to check syntax")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField { field: String, hint: String },

    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Attach context to any error that converts into [`CliError`].
pub trait ResultExt<T> {
    /// Turn an I/O "not found" into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CliError>,
{
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| CliError::Custom(format!("{}\n\nHint: {}", e.into(), hint)))
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| CliError::Custom(format!("{}: {}", msg, e.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_error_carries_hint() {
        let err = ConfigError::InvalidValue {
            field: "builder.publicPath".to_string(),
            value: "/static".to_string(),
            hint: "publicPath must end with '/'".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("builder.publicPath"));
        assert!(message.contains("Hint: publicPath must end with '/'"));
    }

    #[test]
    fn test_with_path_maps_not_found() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.with_path("webapp/index.html").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(p) if p == Path::new("webapp/index.html")));
    }

    #[test]
    fn test_with_path_keeps_other_io_errors() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(result.with_path("dist").unwrap_err(), CliError::Io(_)));
    }

    #[test]
    fn test_context_prefixes_message() {
        let result: std::result::Result<(), CliError> =
            Err(CliError::InvalidArgument("--domain".to_string()));
        let err = result.context("graph").unwrap_err();
        assert_eq!(err.to_string(), "graph: Invalid argument: --domain");
    }

    #[test]
    fn test_build_error_converts() {
        let err: CliError = stax_builder::BuildError::EntryNotFound("server/index".into()).into();
        assert!(err.to_string().contains("server/index"));
    }
}
