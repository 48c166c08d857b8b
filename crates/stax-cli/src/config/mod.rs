//! Project configuration with multi-source loading.
//!
//! Priority: CLI flags > `STAX_*` environment variables > `stax.config.json`
//! > defaults.

mod defaults;
mod loading;
mod validation;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use stax_builder::{BuilderOptions, ExternalModulesOptions};

pub use defaults::*;
pub use loading::ConfigOverrides;

/// Contents of `stax.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StaxConfig {
    /// Source root shared by the server and the web app
    #[serde(default = "default_src")]
    pub src: PathBuf,

    /// Output root; the server lands in `<out>/app`, the web app in `<out>/public`
    #[serde(default = "default_out")]
    pub out: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub webapp: WebAppConfig,

    /// Builder tunables shared by both domains
    #[serde(default)]
    pub builder: BuilderConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for StaxConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            out: default_out(),
            server: ServerConfig::default(),
            webapp: WebAppConfig::default(),
            builder: BuilderConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerConfig {
    /// Server entrypoint relative to `src`; the extension may be omitted
    #[serde(default = "default_server_entry")]
    pub entrypoint: String,

    /// Program that runs the compiled entry in watch mode
    #[serde(default = "default_server_command")]
    pub command: String,

    /// Arguments of the command; the compiled entry replaces an `{entry}`
    /// argument, or goes before all of them
    #[serde(default = "default_server_args")]
    pub args: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            entrypoint: default_server_entry(),
            command: default_server_command(),
            args: default_server_args(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WebAppConfig {
    /// Web-app entrypoint relative to `src`; the extension may be omitted
    #[serde(default = "default_webapp_entry")]
    pub entrypoint: String,

    /// `<title>` added to index.html when the template has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for WebAppConfig {
    fn default() -> Self {
        Self {
            entrypoint: default_webapp_entry(),
            title: None,
        }
    }
}

impl WebAppConfig {
    pub fn title(&self) -> String {
        self.title.clone().unwrap_or_else(default_title)
    }
}

/// Everything of [`BuilderOptions`] except the per-domain entry and paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuilderConfig {
    #[serde(default = "default_recurse")]
    pub recurse: bool,

    #[serde(default)]
    pub asset_dir: String,

    /// URL prefix the web app is served under; must end with `/`
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Package handling of the web app. The server always leaves package
    /// imports to its own runtime.
    #[serde(default = "default_external_modules")]
    pub external_modules: ExternalModulesOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_resolver_wrapper_function: Option<String>,

    #[serde(default = "default_package_dirs")]
    pub package_dirs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_salt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    /// Write `modules.json` next to each entry output
    #[serde(default)]
    pub manifest: bool,

    /// Global expressions replaced at compile time, on top of the
    /// `process.env.*` defines; values are JavaScript source
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub define: BTreeMap<String, String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            recurse: default_recurse(),
            asset_dir: String::new(),
            public_path: default_public_path(),
            external_modules: default_external_modules(),
            module_resolver_wrapper_function: None,
            package_dirs: default_package_dirs(),
            asset_salt: None,
            max_concurrency: None,
            manifest: false,
            define: BTreeMap::new(),
        }
    }
}

impl BuilderConfig {
    /// Options for one build of `entrypoint`.
    pub fn options(&self, entrypoint: &str, root: &Path, outdir: &Path) -> BuilderOptions {
        BuilderOptions {
            entrypoint: entrypoint.to_string(),
            root: root.to_path_buf(),
            outdir: outdir.to_path_buf(),
            recurse: self.recurse,
            asset_dir: self.asset_dir.clone(),
            public_path: self.public_path.clone(),
            external_modules: self.external_modules.clone(),
            module_resolver_wrapper_function: self.module_resolver_wrapper_function.clone(),
            package_dirs: self.package_dirs.clone(),
            asset_salt: self.asset_salt.clone(),
            max_concurrency: self.max_concurrency,
            manifest: self.manifest,
            define: self
                .define
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchConfig {
    /// Events on one path inside this window are coalesced
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Path prefixes (relative to `src`) and `*.ext` patterns to skip
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore: default_ignore(),
        }
    }
}
