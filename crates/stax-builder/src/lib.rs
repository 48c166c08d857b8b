//! # stax-builder
//!
//! The recursive module builder: resolves an entrypoint, walks its relative
//! imports, rewrites every import block into deferred loads, compiles each
//! module on its own and then assembles the externals bundle, the stylesheet
//! bundle and the copied assets.
//!
//! ```no_run
//! use stax_builder::{BuildServices, BuilderOptions, build};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = BuilderOptions::new("webapp/index")
//!     .root("./project")
//!     .outdir("./project/dist/public")
//!     .recurse(true)
//!     .convert_externals(true)
//!     .bundle_externals(true);
//!
//! let output = build(&options, &BuildServices::native()).await?;
//! println!("{} modules in {:?}", output.graph.len(), output.duration);
//! # Ok(()) }
//! ```

pub mod artifacts;
pub mod build;
pub mod bundle;
pub mod compile;
pub mod error;
pub mod options;
pub mod resolve;
pub mod walker;

pub use build::{BuildOutput, BuildServices, build, build_entries, scan};
pub use bundle::{BundleError, BundleReport, BundleRequest, EntryBundler, RolldownBundler};
pub use compile::{CompileError, CompileUnit, CompiledModule, Loader, ModuleCompiler, OxcCompiler};
pub use error::{BuildError, Result};
pub use options::{BuilderOptions, ExternalModulesOptions};
pub use resolve::RESOLVE_SUFFIXES;
pub use walker::Walk;

// Re-export the graph crate so callers need a single dependency.
pub use stax_graph;
