//! Top-level build: walk, compile, write, then the artifact pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use stax_graph::{
    AssetFiles, CssFileList, ExternalRegistry, ModuleGraph, ModulePath, NativeRuntime, Runtime,
    RuntimeError,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::artifacts::{bundle_css_files, bundle_external_modules, copy_assets};
use crate::bundle::{EntryBundler, RolldownBundler};
use crate::compile::{CompileUnit, CompiledModule, ModuleCompiler, OxcCompiler};
use crate::error::{BuildError, Result};
use crate::options::BuilderOptions;
use crate::resolve::resolve_entry;
use crate::walker::{Walk, walk};

/// The collaborators a build talks to.
#[derive(Debug, Clone)]
pub struct BuildServices {
    pub runtime: Arc<dyn Runtime>,
    pub compiler: Arc<dyn ModuleCompiler>,
    pub bundler: Arc<dyn EntryBundler>,
}

impl BuildServices {
    pub fn new(
        runtime: Arc<dyn Runtime>,
        compiler: Arc<dyn ModuleCompiler>,
        bundler: Arc<dyn EntryBundler>,
    ) -> Self {
        Self {
            runtime,
            compiler,
            bundler,
        }
    }

    /// Native filesystem, oxc compilation, rolldown bundling.
    pub fn native() -> Self {
        let runtime: Arc<dyn Runtime> = Arc::new(NativeRuntime);
        Self {
            compiler: Arc::new(OxcCompiler),
            bundler: Arc::new(RolldownBundler::new(Arc::clone(&runtime))),
            runtime,
        }
    }
}

/// Location of `path` as recorded on graph nodes: relative to the output
/// root and `/`-separated, so a graph stays valid when the output moves.
fn output_key(outdir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(outdir).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Everything one build produced.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The flat tree, with `out` set on every written node (relative to
    /// `options.outdir`).
    pub graph: ModuleGraph,
    pub externals: ExternalRegistry,
    pub css_files: CssFileList,
    pub assets: AssetFiles,
    pub entries: Vec<ModulePath>,
    /// Compiled output of the first entrypoint.
    pub entry_output: PathBuf,
    /// Every compiled module written, in discovery order.
    pub outputs: Vec<PathBuf>,
    pub externals_bundle: Option<PathBuf>,
    pub stylesheet: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub duration: Duration,
}

/// Build `options.entrypoint`.
pub async fn build(options: &BuilderOptions, services: &BuildServices) -> Result<BuildOutput> {
    options.validate()?;
    build_entries(options, services, &[options.entrypoint.as_str()]).await
}

/// Walk `options.entrypoint` and return the graph and accumulators without
/// compiling or writing anything.
pub async fn scan(options: &BuilderOptions, runtime: Arc<dyn Runtime>) -> Result<Walk> {
    options.validate()?;
    let entry = resolve_entry(runtime.as_ref(), &options.root, &options.entrypoint).await?;
    walk(options, runtime, &[entry]).await
}

/// Build several entrypoints into one graph. Shared modules are scanned and
/// compiled once; assets and the stylesheet land next to the first entry.
pub async fn build_entries(
    options: &BuilderOptions,
    services: &BuildServices,
    entrypoints: &[&str],
) -> Result<BuildOutput> {
    let started = Instant::now();
    if entrypoints.is_empty() {
        return Err(BuildError::InvalidOptions("no entrypoints given".into()));
    }

    let runtime = services.runtime.as_ref();
    let mut entries = Vec::with_capacity(entrypoints.len());
    for entrypoint in entrypoints {
        entries.push(resolve_entry(runtime, &options.root, entrypoint).await?);
    }
    let first = entries[0].clone();

    let Walk {
        mut graph,
        accumulators,
        units,
    } = walk(options, Arc::clone(&services.runtime), &entries).await?;

    // Nothing is written until every module compiled.
    let compiled = compile_all(services, units, options.concurrency()).await?;

    let mut outputs = Vec::with_capacity(compiled.len());
    for module in compiled {
        let out = options.outdir.join(module.path.output_file().as_str());
        if let Some(parent) = out.parent() {
            runtime.create_dir(parent, true).await?;
        }
        runtime.write_file(&out, module.code.as_bytes()).await?;
        graph.set_out(&module.path, output_key(&options.outdir, &out));
        outputs.push(out);
    }

    let main_out_dir = if first.dir().is_empty() {
        options.outdir.clone()
    } else {
        options.outdir.join(first.dir())
    };
    runtime.create_dir(&main_out_dir, true).await?;

    let externals_bundle =
        if options.external_modules.bundle && !accumulators.externals.is_empty() {
            Some(
                bundle_external_modules(
                    services,
                    &options.root,
                    &accumulators.externals,
                    &main_out_dir,
                    &options.external_modules.bundle_out_name,
                )
                .await?,
            )
        } else {
            None
        };

    let stylesheet = if accumulators.css_files.is_empty() {
        None
    } else {
        let name = format!("{}.css", first.file_stem());
        let path = bundle_css_files(
            services,
            &options.root,
            &accumulators.css_files,
            &main_out_dir,
            &name,
        )
        .await?;
        for css in accumulators.css_files.iter() {
            graph.set_out(css, output_key(&options.outdir, &path));
        }
        Some(path)
    };

    let asset_dir = if options.asset_dir.is_empty() {
        main_out_dir.clone()
    } else {
        main_out_dir.join(&options.asset_dir)
    };
    let copied = copy_assets(services, &options.root, &accumulators.assets, &asset_dir).await?;
    for (asset, target) in accumulators.assets.iter().zip(&copied) {
        graph.set_out(&asset.asset_path, output_key(&options.outdir, target));
    }

    let manifest = if options.manifest {
        let path = main_out_dir.join("modules.json");
        let json = graph
            .to_json()
            .map_err(|e| RuntimeError::Other(format!("cannot serialize module graph: {}", e)))?;
        runtime.write_file(&path, json.as_bytes()).await?;
        Some(path)
    } else {
        None
    };

    let duration = started.elapsed();
    tracing::info!(
        entry = %first,
        modules = outputs.len(),
        nodes = graph.len(),
        duration_ms = duration.as_millis() as u64,
        "build finished"
    );

    Ok(BuildOutput {
        graph,
        externals: accumulators.externals,
        css_files: accumulators.css_files,
        assets: accumulators.assets,
        entry_output: options.outdir.join(first.output_file().as_str()),
        entries,
        outputs,
        externals_bundle,
        stylesheet,
        manifest,
        duration,
    })
}

/// Compile every unit concurrently. Results come back in input order; when
/// several modules fail, the first one in discovery order is reported.
async fn compile_all(
    services: &BuildServices,
    units: Vec<CompileUnit>,
    limit: usize,
) -> Result<Vec<CompiledModule>> {
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut tasks = JoinSet::new();
    let count = units.len();

    for (index, unit) in units.into_iter().enumerate() {
        let compiler = Arc::clone(&services.compiler);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => compiler.compile(unit).await.map_err(BuildError::from),
                Err(e) => Err(BuildError::TaskFailed(e.to_string())),
            };
            (index, result)
        });
    }

    let mut slots: Vec<Option<CompiledModule>> = (0..count).map(|_| None).collect();
    let mut failures: Vec<(usize, BuildError)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.map_err(|e| BuildError::TaskFailed(e.to_string()))?;
        match result {
            Ok(module) => slots[index] = Some(module),
            Err(err) => failures.push((index, err)),
        }
    }

    if !failures.is_empty() {
        failures.sort_by_key(|(index, _)| *index);
        let mut failures = failures.into_iter();
        if let Some((_, first)) = failures.next() {
            for (_, other) in failures {
                tracing::error!("{}", other);
            }
            return Err(first);
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
