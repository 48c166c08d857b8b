//! The "compile one module" capability.
//!
//! The walker hands every rewritten module to a [`ModuleCompiler`]. The
//! default [`OxcCompiler`] strips types and lowers JSX with oxc, replaces
//! the configured global defines and prints plain ES modules; tests plug in
//! their own implementation.

use async_trait::async_trait;
use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use oxc_transformer_plugins::{ReplaceGlobalDefines, ReplaceGlobalDefinesConfig};
use stax_graph::ModulePath;
use std::path::Path;
use std::sync::Arc;

/// Language mode of a module, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
}

impl Loader {
    pub fn from_path(path: &ModulePath) -> Self {
        match path.extension() {
            Some("ts") => Loader::Ts,
            Some("tsx") => Loader::Tsx,
            Some("jsx") => Loader::Jsx,
            _ => Loader::Js,
        }
    }

    fn source_type(self) -> SourceType {
        match self {
            Loader::Js => SourceType::mjs(),
            Loader::Jsx => SourceType::jsx(),
            Loader::Ts => SourceType::ts(),
            Loader::Tsx => SourceType::tsx(),
        }
    }
}

/// One rewritten module ready to compile.
#[derive(Debug, Clone)]
pub struct CompileUnit {
    pub path: ModulePath,
    pub source: String,
    pub loader: Loader,
    /// Global expressions to replace, shared by every unit of a build.
    pub defines: Arc<IndexMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub path: ModulePath,
    pub code: String,
}

/// Every diagnostic the compiler reported for one module.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to compile `{path}`:\n  {}", .diagnostics.join("\n  "))]
pub struct CompileError {
    pub path: ModulePath,
    pub diagnostics: Vec<String>,
}

#[async_trait]
pub trait ModuleCompiler: Send + Sync + std::fmt::Debug {
    async fn compile(&self, unit: CompileUnit) -> Result<CompiledModule, CompileError>;
}

/// oxc_parser → oxc_semantic → oxc_transformer → defines → oxc_codegen, on
/// the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct OxcCompiler;

#[async_trait]
impl ModuleCompiler for OxcCompiler {
    async fn compile(&self, unit: CompileUnit) -> Result<CompiledModule, CompileError> {
        let path = unit.path.clone();
        tokio::task::spawn_blocking(move || compile_sync(unit))
            .await
            .map_err(|e| CompileError {
                path,
                diagnostics: vec![format!("compile task failed: {}", e)],
            })?
    }
}

fn compile_sync(unit: CompileUnit) -> Result<CompiledModule, CompileError> {
    let fail = |diagnostics: Vec<String>| CompileError {
        path: unit.path.clone(),
        diagnostics,
    };

    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, &unit.source, unit.loader.source_type()).parse();
    if !parsed.errors.is_empty() {
        return Err(fail(parsed.errors.iter().map(ToString::to_string).collect()));
    }
    let mut program = parsed.program;

    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();

    let transformed = Transformer::new(
        &allocator,
        Path::new(unit.path.as_str()),
        &TransformOptions::default(),
    )
    .build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(fail(
            transformed.errors.iter().map(ToString::to_string).collect(),
        ));
    }

    if !unit.defines.is_empty() {
        let defines: Vec<(&str, &str)> = unit
            .defines
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let config = ReplaceGlobalDefinesConfig::new(&defines)
            .map_err(|errors| fail(errors.iter().map(ToString::to_string).collect()))?;
        ReplaceGlobalDefines::new(&allocator, config).build(transformed.scoping, &mut program);
    }

    Ok(CompiledModule {
        path: unit.path.clone(),
        code: Codegen::new().build(&program).code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(path: &str, source: &str) -> CompileUnit {
        let path = ModulePath::new(path);
        CompileUnit {
            loader: Loader::from_path(&path),
            path,
            source: source.to_string(),
            defines: Arc::default(),
        }
    }

    #[test]
    fn test_loader_from_extension() {
        assert_eq!(Loader::from_path(&ModulePath::new("a.ts")), Loader::Ts);
        assert_eq!(Loader::from_path(&ModulePath::new("a.tsx")), Loader::Tsx);
        assert_eq!(Loader::from_path(&ModulePath::new("a.jsx")), Loader::Jsx);
        assert_eq!(Loader::from_path(&ModulePath::new("a.mjs")), Loader::Js);
        assert_eq!(Loader::from_path(&ModulePath::new("a.js")), Loader::Js);
    }

    #[tokio::test]
    async fn test_strips_types() {
        let compiled = OxcCompiler
            .compile(unit(
                "a.ts",
                "const mod = await import(\"./b.js\");\nexport const n: number = mod.value;\n",
            ))
            .await
            .unwrap();
        assert!(compiled.code.contains("await import(\"./b.js\")"));
        assert!(!compiled.code.contains(": number"));
    }

    #[tokio::test]
    async fn test_defines_replace_env_reads() {
        let mut unit = unit(
            "config.ts",
            "export const api: string = process.env.API_URL;\nexport const home = process.env.HOME_DIR;\n",
        );
        unit.defines = Arc::new(IndexMap::from([(
            "process.env.API_URL".to_string(),
            "\"/api\"".to_string(),
        )]));
        let compiled = OxcCompiler.compile(unit).await.unwrap();
        assert!(compiled.code.contains("\"/api\""));
        assert!(!compiled.code.contains("process.env.API_URL"));
        assert!(compiled.code.contains("process.env.HOME_DIR"));
    }

    #[tokio::test]
    async fn test_syntax_error_is_reported() {
        let err = OxcCompiler
            .compile(unit("broken.js", "export const = ;"))
            .await
            .unwrap_err();
        assert_eq!(err.path.as_str(), "broken.js");
        assert!(!err.diagnostics.is_empty());
    }
}
