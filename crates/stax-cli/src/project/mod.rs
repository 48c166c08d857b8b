//! A stax project: one source root, two build domains.
//!
//! The server builds into `<out>/app` with package imports left to its own
//! runtime. The web app builds into `<out>/public` with packages served from
//! the externals bundle, and gets an `index.html`. Each domain is built into
//! `<dir>.staging` first and swapped in only when the whole build succeeded,
//! so a broken change never leaves a half-written output behind.

pub mod env;
pub mod html;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use path_clean::PathClean;
use stax_builder::stax_graph::{ModuleGraph, ModulePath, Runtime};
use stax_builder::{BuildError, BuildOutput, BuildServices, BuilderOptions, Walk, build, scan};

use crate::config::StaxConfig;
use crate::error::Result;
use crate::ui::SummaryRow;
use env::{ENV_FILE, parse_env_file, process_env_defines};
use html::{DEFAULT_TEMPLATE, EMPTY_PAGE, HtmlInjector, PageAssets, script_hash};

/// Files next to the web-app entrypoint that go into the page as they are.
const PAGE_FILES: [&str; 4] = ["index.html", "index.css", "favicon.png", "manifest.json"];
const APP_ICONS_DIR: &str = "app-icons";

/// Server argument replaced by the compiled entry.
pub const ENTRY_PLACEHOLDER: &str = "{entry}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Server,
    WebApp,
}

impl Domain {
    /// Directory name under the output root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Domain::Server => "app",
            Domain::WebApp => "public",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Server => f.write_str("server"),
            Domain::WebApp => f.write_str("webapp"),
        }
    }
}

/// A domain built into its staging directory, not yet live.
#[derive(Debug)]
pub struct StagedBuild {
    domain: Domain,
    staging: PathBuf,
    live: PathBuf,
    output: Option<BuildOutput>,
    bytes: u64,
    started: Instant,
}

impl StagedBuild {
    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn graph(&self) -> Option<&ModuleGraph> {
        self.output.as_ref().map(|output| &output.graph)
    }

    /// Replace the live directory with the staged one. The live directory is
    /// moved aside first and put back if the staged one cannot take its
    /// place.
    pub async fn commit(self, runtime: &dyn Runtime) -> Result<DomainBuild> {
        let previous = self
            .live
            .with_file_name(format!("{}.previous", self.domain.dir_name()));
        runtime.remove_dir_all(&previous).await?;
        let had_live = runtime.exists(&self.live);
        if had_live {
            runtime.rename(&self.live, &previous).await?;
        }
        if let Err(err) = runtime.rename(&self.staging, &self.live).await {
            if had_live {
                if let Err(restore) = runtime.rename(&previous, &self.live).await {
                    tracing::error!(dir = %self.live.display(), "failed to restore previous output: {}", restore);
                }
            }
            if let Err(cleanup) = runtime.remove_dir_all(&self.staging).await {
                tracing::warn!(dir = %self.staging.display(), "failed to remove staging dir: {}", cleanup);
            }
            return Err(err.into());
        }
        if let Err(cleanup) = runtime.remove_dir_all(&previous).await {
            tracing::warn!(dir = %previous.display(), "failed to remove previous output: {}", cleanup);
        }
        tracing::debug!(domain = %self.domain, dir = %self.live.display(), "output swapped in");
        Ok(DomainBuild {
            domain: self.domain,
            dir: self.live,
            output: self.output,
            bytes: self.bytes,
            duration: self.started.elapsed(),
        })
    }
}

/// A domain whose output is live.
#[derive(Debug)]
pub struct DomainBuild {
    pub domain: Domain,
    /// The live output directory.
    pub dir: PathBuf,
    /// `None` when the web app has no entrypoint.
    pub output: Option<BuildOutput>,
    /// Total size of the compiled modules and bundles.
    pub bytes: u64,
    pub duration: Duration,
}

impl DomainBuild {
    /// Compiled entrypoint inside the live directory.
    pub fn entry_output(&self) -> Option<PathBuf> {
        let output = self.output.as_ref()?;
        let entry = output.entries.first()?;
        Some(self.dir.join(entry.output_file().as_str()))
    }

    pub fn modules(&self) -> usize {
        self.output.as_ref().map_or(0, |output| output.outputs.len())
    }

    pub fn summary_row(&self) -> SummaryRow {
        SummaryRow {
            label: self.domain.to_string(),
            modules: self.modules(),
            bytes: self.bytes,
            duration: self.duration,
        }
    }
}

#[derive(Debug)]
pub struct ProjectBuild {
    pub server: DomainBuild,
    pub webapp: DomainBuild,
}

#[derive(Debug)]
pub struct Project {
    config: StaxConfig,
    cwd: PathBuf,
    src: PathBuf,
    out: PathBuf,
    services: BuildServices,
}

impl Project {
    pub fn new(config: StaxConfig, cwd: &Path) -> Self {
        Self::with_services(config, cwd, BuildServices::native())
    }

    /// `src` and `out` are resolved against `cwd`.
    pub fn with_services(config: StaxConfig, cwd: &Path, services: BuildServices) -> Self {
        let src = cwd.join(&config.src).clean();
        let out = cwd.join(&config.out).clean();
        Self {
            cwd: cwd.to_path_buf(),
            src,
            out,
            config,
            services,
        }
    }

    pub fn config(&self) -> &StaxConfig {
        &self.config
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn src(&self) -> &Path {
        &self.src
    }

    pub fn out(&self) -> &Path {
        &self.out
    }

    pub fn runtime(&self) -> Arc<dyn Runtime> {
        Arc::clone(&self.services.runtime)
    }

    pub fn domain_dir(&self, domain: Domain) -> PathBuf {
        self.out.join(domain.dir_name())
    }

    fn staging_dir(&self, domain: Domain) -> PathBuf {
        self.out.join(format!("{}.staging", domain.dir_name()))
    }

    pub fn entrypoint(&self, domain: Domain) -> &str {
        match domain {
            Domain::Server => &self.config.server.entrypoint,
            Domain::WebApp => &self.config.webapp.entrypoint,
        }
    }

    /// Builder options for `domain`, writing below `outdir`.
    pub fn options(&self, domain: Domain, outdir: &Path) -> BuilderOptions {
        let builder = &self.config.builder;
        let mut options = builder.options(self.entrypoint(domain), &self.src, outdir);
        match domain {
            Domain::Server => {
                options.external_modules.convert = false;
                options.external_modules.bundle = false;
            }
            Domain::WebApp => {
                // The externals bundle lands next to the entry output.
                let entry_dir = ModulePath::new(self.entrypoint(domain)).dir().to_string();
                if !entry_dir.is_empty() {
                    options.public_path = format!("{}{}/", builder.public_path, entry_dir);
                }
            }
        }
        options
    }

    /// Whether `path` is read by a build of `domain` without being a module:
    /// the `.env` file for both domains, and the web app's page files.
    pub fn is_page_input(&self, domain: Domain, path: &Path) -> bool {
        if path == self.src.join(ENV_FILE) {
            return true;
        }
        if domain != Domain::WebApp {
            return false;
        }
        let entry_dir = self
            .src
            .join(ModulePath::new(self.entrypoint(domain)).dir());
        let Ok(relative) = path.strip_prefix(&entry_dir) else {
            return false;
        };
        relative.starts_with(APP_ICONS_DIR)
            || PAGE_FILES.iter().any(|name| relative == Path::new(name))
    }

    /// `process.env.*` defines, read fresh for every build so edits to
    /// `.env` are picked up in watch mode.
    async fn env_defines(&self) -> Result<IndexMap<String, String>> {
        let runtime = self.services.runtime.as_ref();
        let path = self.src.join(ENV_FILE);
        let file = if runtime.is_file(&path).await {
            parse_env_file(&runtime.read_to_string(&path).await?, &path)?
        } else {
            Vec::new()
        };
        let process = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
        Ok(process_env_defines(process, file))
    }

    /// URL of a file inside the web app's output directory.
    fn public_url(&self, relative: &str) -> String {
        format!("{}{}", self.config.builder.public_path, relative)
    }

    /// Build both domains concurrently and swap each one in.
    ///
    /// Both builds always run to completion; when both fail, the server's
    /// error is reported.
    pub async fn build(&self) -> Result<ProjectBuild> {
        let (server, webapp) = tokio::join!(
            self.build_domain(Domain::Server),
            self.build_domain(Domain::WebApp)
        );
        if let (Err(_), Err(webapp_err)) = (&server, &webapp) {
            tracing::error!(domain = %Domain::WebApp, "{}", webapp_err);
        }
        Ok(ProjectBuild {
            server: server?,
            webapp: webapp?,
        })
    }

    pub async fn build_domain(&self, domain: Domain) -> Result<DomainBuild> {
        let staged = self.build_staged(domain).await?;
        staged.commit(self.services.runtime.as_ref()).await
    }

    /// Build `domain` into its staging directory. On failure the staging
    /// directory is removed and the live output is left alone.
    pub async fn build_staged(&self, domain: Domain) -> Result<StagedBuild> {
        let started = Instant::now();
        let runtime = self.services.runtime.as_ref();
        let staging = self.staging_dir(domain);
        runtime.remove_dir_all(&staging).await?;
        runtime.create_dir(&staging, true).await?;

        match self.build_into(domain, &staging).await {
            Ok((output, bytes)) => Ok(StagedBuild {
                domain,
                live: self.domain_dir(domain),
                staging,
                output,
                bytes,
                started,
            }),
            Err(err) => {
                if let Err(cleanup) = runtime.remove_dir_all(&staging).await {
                    tracing::warn!(dir = %staging.display(), "failed to remove staging dir: {}", cleanup);
                }
                Err(err)
            }
        }
    }

    async fn build_into(&self, domain: Domain, staging: &Path) -> Result<(Option<BuildOutput>, u64)> {
        let mut options = self.options(domain, staging);
        // Configured defines win over the environment.
        let mut define = self.env_defines().await?;
        define.extend(std::mem::take(&mut options.define));
        options.define = define;
        let result = build(&options, &self.services).await;

        let output = match (domain, result) {
            (_, Ok(output)) => output,
            (Domain::WebApp, Err(BuildError::EntryNotFound(entry))) => {
                tracing::info!(entry = %entry, "no web app entrypoint, writing placeholder page");
                self.services
                    .runtime
                    .write_file(&staging.join("index.html"), EMPTY_PAGE.as_bytes())
                    .await?;
                return Ok((None, 0));
            }
            (_, Err(err)) => return Err(err.into()),
        };

        if domain == Domain::WebApp {
            self.write_index_html(&output, staging).await?;
        }
        let bytes = self.output_size(&output).await;
        Ok((Some(output), bytes))
    }

    async fn output_size(&self, output: &BuildOutput) -> u64 {
        let files = output
            .outputs
            .iter()
            .chain(output.externals_bundle.iter())
            .chain(output.stylesheet.iter());
        let mut total = 0;
        for file in files {
            if let Ok(metadata) = self.services.runtime.metadata(file).await {
                total += metadata.size;
            }
        }
        total
    }

    async fn write_index_html(&self, output: &BuildOutput, staging: &Path) -> Result<()> {
        let runtime = self.services.runtime.as_ref();
        let Some(entry) = output.entries.first() else {
            return Ok(());
        };
        let entry_src_dir = self.src.join(entry.dir());

        let template_path = entry_src_dir.join("index.html");
        let template = if runtime.is_file(&template_path).await {
            runtime.read_to_string(&template_path).await?
        } else {
            DEFAULT_TEMPLATE.to_string()
        };

        let compiled = runtime.read_file(&output.entry_output).await?;
        let script = format!(
            "{}?v={}",
            self.public_url(entry.output_file().as_str()),
            script_hash(&compiled)
        );

        let stylesheet = output
            .stylesheet
            .as_ref()
            .map(|path| self.public_url(&output_url(staging, path)));

        let favicon_path = entry_src_dir.join("favicon.png");
        let favicon = if runtime.is_file(&favicon_path).await {
            runtime.copy_file(&favicon_path, &staging.join("favicon.png")).await?;
            Some(self.public_url("favicon.png"))
        } else {
            None
        };

        // The user's root stylesheet lands next to the bundled one and never
        // replaces it.
        let css_path = entry_src_dir.join("index.css");
        let root_stylesheet = if runtime.is_file(&css_path).await {
            let css_dir = staging.join(entry.dir());
            runtime.create_dir(&css_dir, true).await?;
            let target = free_stylesheet_name(runtime, &css_dir);
            runtime.copy_file(&css_path, &target).await?;
            Some(self.public_url(&output_url(staging, &target)))
        } else {
            None
        };

        let manifest_path = entry_src_dir.join("manifest.json");
        let manifest = if runtime.is_file(&manifest_path).await {
            runtime.copy_file(&manifest_path, &staging.join("manifest.json")).await?;
            Some(self.public_url("manifest.json"))
        } else {
            None
        };

        let icons = entry_src_dir.join(APP_ICONS_DIR);
        if runtime.metadata(&icons).await.is_ok_and(|m| m.is_dir) {
            copy_dir(runtime, &icons, &staging.join(APP_ICONS_DIR)).await?;
        }

        let assets = PageAssets {
            title: self.config.webapp.title(),
            stylesheet,
            root_stylesheet,
            favicon,
            manifest,
            script,
        };
        let html = HtmlInjector::new()?.render(&template, &assets);
        runtime.write_file(&staging.join("index.html"), html.as_bytes()).await?;
        Ok(())
    }

    /// Walk one domain without writing any output.
    pub async fn scan(&self, domain: Domain) -> Result<Walk> {
        let options = self.options(domain, &self.domain_dir(domain));
        Ok(scan(&options, self.runtime()).await?)
    }

    /// Program and arguments that run the live server entry. The entry goes
    /// where an `{entry}` argument stands, or first.
    pub fn server_command(&self, entry_output: &Path) -> (String, Vec<String>) {
        let server = &self.config.server;
        let entry = entry_output.to_string_lossy().into_owned();
        let mut args = Vec::with_capacity(server.args.len() + 1);
        if !server.args.iter().any(|arg| arg == ENTRY_PLACEHOLDER) {
            args.push(entry.clone());
        }
        args.extend(server.args.iter().map(|arg| {
            if arg == ENTRY_PLACEHOLDER {
                entry.clone()
            } else {
                arg.clone()
            }
        }));
        (server.command.clone(), args)
    }
}

/// `path` below `staging`, `/`-separated.
fn output_url(staging: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(staging).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// `index.css` in `dir`, or the first free `index-<n>.css`.
fn free_stylesheet_name(runtime: &dyn Runtime, dir: &Path) -> PathBuf {
    let mut target = dir.join("index.css");
    let mut count = 0;
    while runtime.exists(&target) {
        count += 1;
        target = dir.join(format!("index-{}.css", count));
    }
    target
}

/// Copy the tree at `from` to `to`.
async fn copy_dir(runtime: &dyn Runtime, from: &Path, to: &Path) -> Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((from, to)) = pending.pop() {
        runtime.create_dir(&to, true).await?;
        for name in runtime.read_dir(&from).await? {
            let source = from.join(&name);
            if runtime.metadata(&source).await?.is_dir {
                pending.push((source, to.join(&name)));
            } else {
                runtime.copy_file(&source, &to.join(&name)).await?;
            }
        }
    }
    Ok(())
}
