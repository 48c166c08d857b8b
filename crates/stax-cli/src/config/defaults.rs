use std::path::PathBuf;

use stax_builder::ExternalModulesOptions;

pub const CONFIG_FILE: &str = "stax.config.json";

pub fn default_src() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_out() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_server_entry() -> String {
    "server/index".to_string()
}

pub fn default_server_command() -> String {
    "node".to_string()
}

pub fn default_server_args() -> Vec<String> {
    vec!["--development".to_string()]
}

pub fn default_webapp_entry() -> String {
    "webapp/index".to_string()
}

pub fn default_title() -> String {
    "Stax WebApp".to_string()
}

pub fn default_recurse() -> bool {
    true
}

pub fn default_public_path() -> String {
    "/".to_string()
}

/// The web app loads packages from the externals bundle by default.
pub fn default_external_modules() -> ExternalModulesOptions {
    ExternalModulesOptions {
        convert: true,
        bundle: true,
        ..ExternalModulesOptions::default()
    }
}

pub fn default_package_dirs() -> Vec<String> {
    vec!["node_modules".to_string()]
}

pub fn default_debounce_ms() -> u64 {
    100
}

pub fn default_ignore() -> Vec<String> {
    vec!["node_modules".to_string(), "dist".to_string()]
}
