//! Builder configuration.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

/// How bare package imports are handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ExternalModulesOptions {
    /// Rewrite package imports into deferred loads from the externals bundle.
    /// When false the original statements are left in place.
    pub convert: bool,

    /// Bundle every referenced package into one externals file after the walk.
    pub bundle: bool,

    /// File name of the externals bundle, inside the entry's output directory.
    pub bundle_out_name: String,
}

impl Default for ExternalModulesOptions {
    fn default() -> Self {
        Self {
            convert: false,
            bundle: false,
            bundle_out_name: "externals.js".to_string(),
        }
    }
}

/// Options for one build of one entrypoint.
///
/// ```
/// use stax_builder::BuilderOptions;
///
/// let options = BuilderOptions::new("webapp/index")
///     .root("./project")
///     .outdir("./project/dist")
///     .recurse(true)
///     .convert_externals(true);
/// assert_eq!(options.public_path, "/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuilderOptions {
    /// Module to start from, relative to `root`. The extension may be omitted.
    pub entrypoint: String,
    /// Project root every module path is relative to.
    pub root: PathBuf,
    /// Output root. Compiled modules mirror their source layout below it.
    pub outdir: PathBuf,
    /// Follow relative code imports transitively.
    pub recurse: bool,
    /// Subdirectory of the entry's output directory for copied assets.
    pub asset_dir: String,
    /// URL prefix of the externals bundle.
    pub public_path: String,
    pub external_modules: ExternalModulesOptions,
    /// Runtime function used to load relative modules and assets by key
    /// instead of a relative `import()`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_resolver_wrapper_function: Option<String>,
    /// Directories, relative to `root`, searched for package stylesheets.
    pub package_dirs: Vec<String>,
    /// Fixed salt for asset names. Random per build when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_salt: Option<String>,
    /// Upper bound on concurrent scan and compile tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Write the flat tree as `modules.json` next to the entry output.
    pub manifest: bool,
    /// Global expressions replaced at compile time, such as
    /// `process.env.API_URL`. Values are JavaScript source text.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub define: IndexMap<String, String>,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            entrypoint: String::new(),
            root: PathBuf::from("."),
            outdir: PathBuf::from("dist"),
            recurse: false,
            asset_dir: String::new(),
            public_path: "/".to_string(),
            external_modules: ExternalModulesOptions::default(),
            module_resolver_wrapper_function: None,
            package_dirs: vec!["node_modules".to_string()],
            asset_salt: None,
            max_concurrency: None,
            manifest: false,
            define: IndexMap::new(),
        }
    }
}

impl BuilderOptions {
    pub fn new(entrypoint: impl Into<String>) -> Self {
        Self {
            entrypoint: entrypoint.into(),
            ..Self::default()
        }
    }

    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    pub fn outdir(mut self, outdir: impl AsRef<Path>) -> Self {
        self.outdir = outdir.as_ref().to_path_buf();
        self
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn asset_dir(mut self, asset_dir: impl Into<String>) -> Self {
        self.asset_dir = asset_dir.into();
        self
    }

    pub fn public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = public_path.into();
        self
    }

    pub fn convert_externals(mut self, convert: bool) -> Self {
        self.external_modules.convert = convert;
        self
    }

    pub fn bundle_externals(mut self, bundle: bool) -> Self {
        self.external_modules.bundle = bundle;
        self
    }

    pub fn resolver_wrapper(mut self, function: impl Into<String>) -> Self {
        self.module_resolver_wrapper_function = Some(function.into());
        self
    }

    pub fn asset_salt(mut self, salt: impl Into<String>) -> Self {
        self.asset_salt = Some(salt.into());
        self
    }

    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    pub fn manifest(mut self, manifest: bool) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn define(mut self, expression: impl Into<String>, value: impl Into<String>) -> Self {
        self.define.insert(expression.into(), value.into());
        self
    }

    /// Concurrency limit actually used for task pools.
    pub(crate) fn concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }

    /// URL the rewritten external imports load from.
    pub(crate) fn externals_url(&self) -> String {
        format!(
            "{}{}",
            self.public_path, self.external_modules.bundle_out_name
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.entrypoint.trim().is_empty() {
            return Err(BuildError::InvalidOptions("entrypoint is empty".into()));
        }
        if self.external_modules.bundle_out_name.trim().is_empty() {
            return Err(BuildError::InvalidOptions(
                "externalModules.bundleOutName is empty".into(),
            ));
        }
        if let Some(function) = &self.module_resolver_wrapper_function {
            if function.trim().is_empty() {
                return Err(BuildError::InvalidOptions(
                    "moduleResolverWrapperFunction is empty".into(),
                ));
            }
        }
        if let Some(expression) = self.define.keys().find(|key| !is_define_key(key)) {
            return Err(BuildError::InvalidOptions(format!(
                "define key `{}` is not a dotted identifier",
                expression
            )));
        }
        Ok(())
    }
}

/// `a`, `a.b`, `process.env.API_URL`.
fn is_define_key(key: &str) -> bool {
    key.split('.').all(|part| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_' || first == '$')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let options: BuilderOptions = serde_json::from_str(r#"{"entrypoint":"index"}"#).unwrap();
        assert_eq!(options.outdir, PathBuf::from("dist"));
        assert!(!options.recurse);
        assert_eq!(options.asset_dir, "");
        assert_eq!(options.public_path, "/");
        assert!(!options.external_modules.convert);
        assert!(!options.external_modules.bundle);
        assert_eq!(options.external_modules.bundle_out_name, "externals.js");
        assert!(options.module_resolver_wrapper_function.is_none());
        assert_eq!(options.package_dirs, vec!["node_modules"]);
    }

    #[test]
    fn test_camel_case_fields() {
        let options: BuilderOptions = serde_json::from_str(
            r#"{
                "entrypoint": "index",
                "assetDir": "assets",
                "publicPath": "/static/",
                "externalModules": { "convert": true, "bundleOutName": "vendor.js" },
                "moduleResolverWrapperFunction": "load"
            }"#,
        )
        .unwrap();
        assert_eq!(options.asset_dir, "assets");
        assert_eq!(options.externals_url(), "/static/vendor.js");
        assert_eq!(options.module_resolver_wrapper_function.as_deref(), Some("load"));
    }

    #[test]
    fn test_validate() {
        assert!(BuilderOptions::default().validate().is_err());
        assert!(BuilderOptions::new("index").validate().is_ok());

        let mut options = BuilderOptions::new("index");
        options.external_modules.bundle_out_name = String::new();
        assert!(matches!(options.validate(), Err(BuildError::InvalidOptions(_))));
    }

    #[test]
    fn test_define_keys_are_dotted_identifiers() {
        let options = BuilderOptions::new("index")
            .define("process.env.API_URL", "\"/api\"")
            .define("$flag", "true");
        assert!(options.validate().is_ok());

        for key in ["process.env.MY-VAR", "process..env", "1up", ""] {
            let options = BuilderOptions::new("index").define(key, "1");
            assert!(
                matches!(options.validate(), Err(BuildError::InvalidOptions(_))),
                "{key}"
            );
        }
    }

    #[test]
    fn test_concurrency_never_zero() {
        assert_eq!(BuilderOptions::new("i").max_concurrency(0).concurrency(), 1);
    }
}
