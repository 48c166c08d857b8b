//! `process.env.*` defines for both domains.
//!
//! Variables come from the stax process environment and from an optional
//! `.env` file at the source root. A variable already set in the process
//! wins over the file, the way dotenv loading never overrides.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CliError, Result};

pub const ENV_FILE: &str = ".env";

/// Parse the content of a `.env` file.
pub fn parse_env_file(content: &str, path: &Path) -> Result<Vec<(String, String)>> {
    dotenvy::from_read_iter(content.as_bytes())
        .map(|item| {
            item.map_err(|e| CliError::Custom(format!("invalid {}: {}", path.display(), e)))
        })
        .collect()
}

/// `process.env.<NAME>` → JSON string literal of the trimmed value, sorted
/// by name. Names that are not identifiers cannot appear in a member
/// expression and are skipped.
pub fn process_env_defines<I>(process: I, file: Vec<(String, String)>) -> IndexMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut vars: BTreeMap<String, String> = file.into_iter().collect();
    vars.extend(process);
    vars.into_iter()
        .filter(|(name, _)| is_identifier(name))
        .map(|(name, value)| {
            let literal = serde_json::Value::String(value.trim().to_string()).to_string();
            (format!("process.env.{}", name), literal)
        })
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
