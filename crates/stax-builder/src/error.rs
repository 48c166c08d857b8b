use miette::Diagnostic;
use stax_graph::{ModulePath, RuntimeError};
use thiserror::Error;

use crate::bundle::BundleError;
use crate::compile::CompileError;

/// Result type alias for builder operations.
pub type Result<T, E = BuildError> = std::result::Result<T, E>;

/// Everything that can abort a build.
///
/// Malformed import statements are not here: they are skipped inside the
/// module scan and only logged.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// A relative import did not match any file under any resolution suffix.
    #[error("cannot resolve `{specifier}` imported from `{importer}`")]
    #[diagnostic(
        code(stax::module_not_found),
        help("tried the specifier as written, with .ts/.tsx/.js/.jsx/.mjs, and as a directory index")
    )]
    ModuleNotFound {
        specifier: String,
        importer: ModulePath,
    },

    #[error("entrypoint `{0}` not found")]
    #[diagnostic(code(stax::entry_not_found))]
    EntryNotFound(String),

    #[error(transparent)]
    #[diagnostic(code(stax::compile))]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(code(stax::bundle))]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    #[diagnostic(code(stax::io))]
    Runtime(#[from] RuntimeError),

    /// The stylesheet bundle produced no `.css` output.
    #[error("bundling {count} stylesheet(s) produced no .css output")]
    #[diagnostic(code(stax::missing_stylesheet))]
    MissingStylesheet { count: usize },

    /// Code modules are written at their path below the output directory,
    /// so they have to live below the build root.
    #[error("`{module}` imported from `{importer}` is outside the build root")]
    #[diagnostic(
        code(stax::outside_root),
        help("move the module below the build root, or point the root at a common parent")
    )]
    OutsideRoot { module: ModulePath, importer: String },

    #[error("`{first}` and `{second}` both compile to `{output}`")]
    #[diagnostic(code(stax::output_collision), help("rename one of the modules"))]
    OutputCollision {
        output: String,
        first: ModulePath,
        second: ModulePath,
    },

    #[error("invalid builder options: {0}")]
    #[diagnostic(code(stax::invalid_options))]
    InvalidOptions(String),

    /// A spawned scan or compile task panicked or was cancelled.
    #[error("build task failed: {0}")]
    #[diagnostic(
        code(stax::task_failed),
        help("this is a bug in stax, please report it")
    )]
    TaskFailed(String),
}
