//! Stax graph - the data side of the recursive module builder.
//!
//! This crate has no bundler in it. It provides:
//!
//! - [`ModuleGraph`], the flat tree of every module, stylesheet and asset a
//!   build reaches, with placeholder-first insertion so it is always closed
//! - [`imports`], the statement-level scanner that finds import/require
//!   statements, classifies and merges them, and renders deferred loads
//! - [`NameAllocator`] and the build accumulators (externals, CSS, assets)
//! - [`runtime`], the filesystem abstraction every build goes through

pub mod accumulators;
pub mod dependency;
pub mod graph;
pub mod imports;
pub mod names;
pub mod node;
pub mod path;
pub mod runtime;


pub use accumulators::{AssetFile, AssetFiles, BuildAccumulators, CssFileList, ExternalRegistry};
pub use dependency::DependencyRef;
pub use graph::ModuleGraph;
pub use imports::{ImportDefinition, NamedImport};
pub use names::NameAllocator;
pub use node::ModuleNode;
pub use path::{CODE_EXTENSIONS, ModulePath, relative_specifier};
pub use runtime::{FileMetadata, NativeRuntime, Runtime, RuntimeError, RuntimeResult};
