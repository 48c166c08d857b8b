//! The dependency graph walk.
//!
//! Modules are processed through an explicit work queue. Scanning a module
//! (read, tokenize, classify, merge, resolve) is pure with respect to the
//! graph and runs as a task on a bounded [`JoinSet`]. A single coordinator
//! owns the graph and the accumulators and commits finished scans strictly in
//! the order the modules were discovered, buffering scans that finish early.
//! Committing is where paths are claimed, edges are added, names are
//! allocated and imports are rewritten, and it never awaits, so a child is
//! always claimed before the coordinator can observe another scan.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use stax_graph::imports::{
    AnalyzedImport, ImportDefinition, LoadTarget, analyze_raw_import_statement,
    merge_import_definitions, render_deferred_load, replace_import_block, tokenize_imports,
};
use stax_graph::{
    BuildAccumulators, DependencyRef, ModuleGraph, ModulePath, NameAllocator, Runtime,
    relative_specifier,
};

use crate::compile::{CompileUnit, Loader};
use crate::error::{BuildError, Result};
use crate::options::BuilderOptions;
use crate::resolve::{resolve_package_stylesheet, resolve_relative};

/// What a merged import resolved to.
#[derive(Debug, Clone)]
enum Target {
    /// Stylesheet shipped inside an installed package.
    PackageStylesheet(ModulePath),
    /// Bare package specifier.
    External,
    Stylesheet(ModulePath),
    Asset(ModulePath),
    Code(ModulePath),
}

#[derive(Debug)]
struct ScannedImport {
    definition: ImportDefinition,
    target: Target,
    /// Original texts of every statement that imported this specifier.
    statements: Vec<String>,
}

#[derive(Debug)]
struct ScannedModule {
    path: ModulePath,
    source: String,
    imports: Vec<ScannedImport>,
    /// Statements the classifier rejected, re-emitted unchanged.
    malformed: Vec<String>,
}

/// Result of a complete walk: the closed graph, the accumulators and the
/// rewritten source of every module that has to be compiled.
#[derive(Debug, Default)]
pub struct Walk {
    pub graph: ModuleGraph,
    pub accumulators: BuildAccumulators,
    pub units: Vec<CompileUnit>,
}

struct ScanContext {
    runtime: Arc<dyn Runtime>,
    root: PathBuf,
    package_dirs: Vec<String>,
}

async fn scan_module(ctx: &ScanContext, path: ModulePath) -> Result<ScannedModule> {
    let source = ctx.runtime.read_to_string(&path.to_fs_path(&ctx.root)).await?;
    let scan = tokenize_imports(&source);

    let mut definitions = Vec::new();
    let mut texts: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut malformed = Vec::new();
    for statement in &scan.statements {
        match analyze_raw_import_statement(statement) {
            Ok(AnalyzedImport::Definition(definition)) => {
                texts
                    .entry(definition.specifier.clone())
                    .or_default()
                    .push(statement.text.to_string());
                definitions.push(definition);
            }
            Ok(AnalyzedImport::TypeOnly) => {}
            Err(err) => {
                tracing::warn!(module = %path, "{}", err);
                malformed.push(statement.text.to_string());
            }
        }
    }

    let mut imports = Vec::new();
    for (specifier, definition) in merge_import_definitions(definitions) {
        let target = if definition.is_relative() {
            let resolved =
                resolve_relative(ctx.runtime.as_ref(), &ctx.root, &path, &specifier).await?;
            if resolved.is_code() {
                Target::Code(resolved)
            } else if resolved.is_css() {
                Target::Stylesheet(resolved)
            } else {
                Target::Asset(resolved)
            }
        } else {
            match resolve_package_stylesheet(
                ctx.runtime.as_ref(),
                &ctx.root,
                &ctx.package_dirs,
                &specifier,
            )
            .await
            {
                Some(stylesheet) => Target::PackageStylesheet(stylesheet),
                None => Target::External,
            }
        };
        imports.push(ScannedImport {
            statements: texts.shift_remove(&specifier).unwrap_or_default(),
            definition,
            target,
        });
    }

    tracing::debug!(module = %path, imports = imports.len(), "scanned module");
    Ok(ScannedModule {
        path,
        source,
        imports,
        malformed,
    })
}

struct Coordinator<'a> {
    options: &'a BuilderOptions,
    ctx: Arc<ScanContext>,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<(usize, Result<ScannedModule>)>,
    names: NameAllocator,
    /// Directory of the first entrypoint; assets are copied below it.
    entry_dir: String,
    defines: Arc<IndexMap<String, String>>,
    next_seq: usize,
    walk: Walk,
}

impl Coordinator<'_> {
    fn spawn_scan(&mut self, path: ModulePath) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let ctx = Arc::clone(&self.ctx);
        let semaphore = Arc::clone(&self.semaphore);
        self.tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => scan_module(&ctx, path).await,
                Err(e) => Err(BuildError::TaskFailed(e.to_string())),
            };
            (seq, result)
        });
    }

    /// Output path of a copied asset, relative to the output root.
    fn asset_output(&self, unique_name: &str) -> String {
        [self.entry_dir.as_str(), self.options.asset_dir.as_str(), unique_name]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.trim_matches('/'))
            .collect::<Vec<_>>()
            .join("/")
    }

    fn commit(&mut self, scanned: ScannedModule) {
        let ScannedModule {
            path,
            source,
            imports,
            malformed,
        } = scanned;
        let module_dir = path.dir().to_string();
        let wrapper = self.options.module_resolver_wrapper_function.clone();
        let mut rendered: Vec<String> = Vec::new();

        for (slot, import) in imports.into_iter().enumerate() {
            let ScannedImport {
                definition,
                target,
                statements,
            } = import;

            let load = match target {
                Target::PackageStylesheet(stylesheet) => {
                    self.walk.accumulators.css_files.push(stylesheet);
                    None
                }
                Target::External => {
                    let index = self
                        .walk
                        .accumulators
                        .externals
                        .register(&definition.specifier);
                    self.walk.graph.add_dependency(
                        &path,
                        DependencyRef::ExternalPackage {
                            name: definition.specifier.clone(),
                        },
                    );
                    if self.options.external_modules.convert {
                        Some(LoadTarget::External {
                            index,
                            bundle_url: self.options.externals_url(),
                        })
                    } else {
                        rendered.extend(statements);
                        None
                    }
                }
                Target::Stylesheet(stylesheet) => {
                    self.walk.accumulators.css_files.push(stylesheet.clone());
                    self.walk
                        .graph
                        .add_dependency(&path, DependencyRef::CssAsset { path: stylesheet });
                    None
                }
                Target::Asset(asset) => {
                    let names = &mut self.names;
                    let unique_name = self
                        .walk
                        .accumulators
                        .assets
                        .get_or_insert_with(&asset, || names.asset_name(&asset))
                        .unique_name
                        .clone();
                    self.walk.graph.set_asset_name(&asset, unique_name.clone());
                    self.walk.graph.add_dependency(
                        &path,
                        DependencyRef::BinaryAsset {
                            path: asset.clone(),
                            unique_name: unique_name.clone(),
                        },
                    );
                    Some(match &wrapper {
                        Some(function) => LoadTarget::WrappedAsset {
                            function: function.clone(),
                            key: asset.to_string(),
                        },
                        None => LoadTarget::Asset {
                            url: relative_specifier(&module_dir, &self.asset_output(&unique_name)),
                        },
                    })
                }
                Target::Code(child) => {
                    let claimed = self.walk.graph.claim(&child);
                    self.walk.graph.add_dependency(
                        &path,
                        DependencyRef::RelativeModule {
                            path: child.clone(),
                        },
                    );
                    if claimed && self.options.recurse {
                        self.spawn_scan(child.clone());
                    }
                    Some(match &wrapper {
                        Some(function) => LoadTarget::WrappedModule {
                            slot,
                            function: function.clone(),
                            key: child.to_string(),
                        },
                        None => LoadTarget::Module {
                            slot,
                            specifier: relative_specifier(&module_dir, child.output_file().as_str()),
                        },
                    })
                }
            };

            if let Some(load) = load {
                let text = render_deferred_load(&load, &definition);
                if !text.is_empty() {
                    rendered.push(text);
                }
            }
        }
        rendered.extend(malformed);

        // The tokenizer is a pure function of the source, so scanning again
        // recovers the statement spans the scan task could not send back.
        let scan = tokenize_imports(&source);
        let code = replace_import_block(&source, &scan, &rendered.join("\n"));

        self.walk.units.push(CompileUnit {
            loader: Loader::from_path(&path),
            path,
            source: code,
            defines: Arc::clone(&self.defines),
        });
    }
}

/// Walk the graph from `entries` (already resolved).
///
/// Every entry is claimed and scanned; relative code imports are followed
/// when `options.recurse` is set. The first fatal error, in discovery order,
/// aborts the walk and cancels outstanding scans.
pub async fn walk(
    options: &BuilderOptions,
    runtime: Arc<dyn Runtime>,
    entries: &[ModulePath],
) -> Result<Walk> {
    let names = match &options.asset_salt {
        Some(salt) => NameAllocator::seeded(salt),
        None => NameAllocator::random(),
    };

    let mut coordinator = Coordinator {
        options,
        ctx: Arc::new(ScanContext {
            runtime,
            root: options.root.clone(),
            package_dirs: options.package_dirs.clone(),
        }),
        semaphore: Arc::new(Semaphore::new(options.concurrency())),
        tasks: JoinSet::new(),
        names,
        entry_dir: entries
            .first()
            .map(|entry| entry.dir().to_string())
            .unwrap_or_default(),
        defines: Arc::new(options.define.clone()),
        next_seq: 0,
        walk: Walk::default(),
    };

    for entry in entries {
        if coordinator.walk.graph.claim(entry) {
            coordinator.spawn_scan(entry.clone());
        }
    }

    let mut pending: FxHashMap<usize, Result<ScannedModule>> = FxHashMap::default();
    let mut next_commit = 0;
    while let Some(joined) = coordinator.tasks.join_next().await {
        let (seq, result) = joined.map_err(|e| BuildError::TaskFailed(e.to_string()))?;
        pending.insert(seq, result);
        while let Some(result) = pending.remove(&next_commit) {
            next_commit += 1;
            coordinator.commit(result?);
        }
    }

    check_outputs(&coordinator.walk)?;
    Ok(coordinator.walk)
}

/// Every code module must map to its own file below the output directory.
fn check_outputs(walk: &Walk) -> Result<()> {
    let mut outputs: FxHashMap<ModulePath, &ModulePath> = FxHashMap::default();
    for unit in &walk.units {
        if unit.path.is_outside_root() {
            let importer = walk
                .graph
                .get(&unit.path)
                .and_then(|node| node.parents.first())
                .map_or_else(|| "the entrypoints".to_string(), ToString::to_string);
            return Err(BuildError::OutsideRoot {
                module: unit.path.clone(),
                importer,
            });
        }
        let output = unit.path.output_file();
        if let Some(first) = outputs.get(&output) {
            return Err(BuildError::OutputCollision {
                output: output.to_string(),
                first: (*first).clone(),
                second: unit.path.clone(),
            });
        }
        outputs.insert(output, &unit.path);
    }
    Ok(())
}
