use figment::{
    Figment,
    providers::{Format as _, Json, Serialized},
};
use std::path::{Path, PathBuf};

use crate::cli::ProjectArgs;
use crate::config::{CONFIG_FILE, StaxConfig};
use crate::error::{ConfigError, Result};

/// Values given on the command line. Only the ones actually passed are
/// merged, so they never mask the config file with defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub src: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub server_entry: Option<String>,
    pub server_command: Option<String>,
    pub webapp_entry: Option<String>,
    pub debounce_ms: Option<u64>,
    pub manifest: bool,
}

impl From<&ProjectArgs> for ConfigOverrides {
    fn from(args: &ProjectArgs) -> Self {
        Self {
            src: args.src.clone(),
            out: args.out.clone(),
            server_entry: args.server_entry.clone(),
            webapp_entry: args.webapp_entry.clone(),
            manifest: args.manifest,
            ..Self::default()
        }
    }
}

impl ConfigOverrides {
    fn merge_into(&self, mut figment: Figment) -> Figment {
        if let Some(src) = &self.src {
            figment = figment.merge(Serialized::default("src", src));
        }
        if let Some(out) = &self.out {
            figment = figment.merge(Serialized::default("out", out));
        }
        if let Some(entry) = &self.server_entry {
            figment = figment.merge(Serialized::default("server.entrypoint", entry));
        }
        if let Some(command) = &self.server_command {
            figment = figment.merge(Serialized::default("server.command", command));
        }
        if let Some(entry) = &self.webapp_entry {
            figment = figment.merge(Serialized::default("webapp.entrypoint", entry));
        }
        if let Some(debounce) = self.debounce_ms {
            figment = figment.merge(Serialized::default("watch.debounceMs", debounce));
        }
        if self.manifest {
            figment = figment.merge(Serialized::default("builder.manifest", true));
        }
        figment
    }
}

const ENV_PREFIX: &str = "STAX_";

/// `STAX_*` variables as dotted config keys with their values.
///
/// Values that parse as JSON (numbers, booleans, arrays) keep their type;
/// anything else is a string. Figment's `Env` provider lowercases keys, which
/// would lose the camelCase field names, so keys are mapped here instead.
pub(crate) fn env_overrides<I>(vars: I) -> Vec<(String, serde_json::Value)>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, raw)| {
            let key = name.strip_prefix(ENV_PREFIX)?;
            if key.is_empty() {
                return None;
            }
            let value = serde_json::from_str(&raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
            Some((env_key(key), value))
        })
        .collect()
}

/// `WATCH__DEBOUNCE_MS` becomes `watch.debounceMs`.
pub(crate) fn env_key(key: &str) -> String {
    key.split("__").map(camel_case).collect::<Vec<_>>().join(".")
}

fn camel_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper = false;
    for ch in segment.chars() {
        if ch == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

impl StaxConfig {
    /// Load the configuration for a project rooted at `cwd`.
    ///
    /// `config_path` must exist when given; otherwise `cwd/stax.config.json`
    /// is read if present. Environment variables use `__` as the nesting
    /// separator and `_` between words (`STAX_OUT`, `STAX_SERVER__COMMAND`,
    /// `STAX_WATCH__DEBOUNCE_MS`).
    pub fn load(
        cwd: &Path,
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) => {
                let path = cwd.join(path);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => {
                let path = cwd.join(CONFIG_FILE);
                path.is_file().then_some(path)
            }
        };
        if let Some(path) = &config_file {
            tracing::debug!(file = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        let vars = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
        for (key, value) in env_overrides(vars) {
            figment = figment.merge(Serialized::default(&key, value));
        }
        figment = overrides.merge_into(figment);

        let config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: format!("Check {} syntax and field types", CONFIG_FILE),
        })?;
        config.validate()?;
        Ok(config)
    }
}
