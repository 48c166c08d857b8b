//! Import handling on raw source text: scan, classify, merge, rewrite.

mod analyze;
mod merge;
mod rewrite;
mod tokenize;

pub use analyze::{
    AnalyzedImport, ImportDefinition, MalformedImport, NamedImport, analyze_raw_import_statement,
    is_relative_specifier,
};
pub use merge::merge_import_definitions;
pub use rewrite::{LoadTarget, render_deferred_load, replace_import_block};
pub use tokenize::{
    ImportBlock, ImportScan, RawImportStatement, StatementKind, Token, locate_import_block,
    tokenize_imports,
};
