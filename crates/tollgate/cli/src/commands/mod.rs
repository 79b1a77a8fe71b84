//! Command implementations

pub mod veto;
pub mod window;

use crate::error::{CliError, CliResult};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read a YAML, JSON or TOML document, chosen by file extension
///
/// Anything other than `.json` or `.toml` is read as YAML.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&contents)?),
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| CliError::InvalidInput(format!("{}: {e}", path.display()))),
        _ => Ok(serde_yaml::from_str(&contents)?),
    }
}

/// Render a set of numbers as `a,b,c`, or `any` when empty
pub(crate) fn join_set<'a>(values: impl IntoIterator<Item = &'a u32>) -> String {
    let joined = values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        "any".to_string()
    } else {
        joined
    }
}
