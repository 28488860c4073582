//! Config operations: listing, key lookup, and result types.
//!
//! Provides the logic behind `config list` and `config get`, and the
//! `ConfigResult` enum that callers use to display results of every
//! [`ConfigAction`](crate::ConfigAction).

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::KeyfigError;
use crate::merge::get_path;
use crate::schema::{SchemaNode, SourceKeys};

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// All resolved values as `(field path, value)` pairs.
    Listing { entries: Vec<(String, String)> },
    /// One resolved value and the keys it is read from.
    KeyValue {
        key: String,
        value: String,
        keys: SourceKeys,
    },
    /// A JSON Schema document.
    Schema(String),
    /// A Markdown reference page.
    Doc(String),
    /// Confirmation that output was written to a file.
    Written { path: PathBuf },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
            ConfigResult::KeyValue { key, value, keys } => {
                writeln!(
                    f,
                    "# file: {}, env: {}, cli: --{}",
                    keys.file, keys.env, keys.cli
                )?;
                write!(f, "{key} = {value}")
            }
            ConfigResult::Schema(text) | ConfigResult::Doc(text) => write!(f, "{text}"),
            ConfigResult::Written { path } => write!(f, "Written to {}", path.display()),
        }
    }
}

/// List every leaf of `schema` with its value in the resolved `tree`.
pub fn list_values(schema: &SchemaNode, tree: &Value) -> ConfigResult {
    let entries = schema
        .leaves()
        .into_iter()
        .map(|(path, _)| {
            let display = get_path(tree, &path)
                .filter(|v| !v.is_null())
                .map(format_value)
                .unwrap_or_else(|| "<not set>".to_string());
            (path, display)
        })
        .collect();
    ConfigResult::Listing { entries }
}

/// Look up one resolved value by dotted field path or by file key.
pub fn get_value(schema: &SchemaNode, tree: &Value, key: &str) -> Result<ConfigResult, KeyfigError> {
    let (path, leaf) = schema
        .leaves()
        .into_iter()
        .find(|(path, leaf)| path == key || leaf.keys.file == key)
        .ok_or_else(|| KeyfigError::KeyNotFound(key.into()))?;

    let value = get_path(tree, &path)
        .filter(|v| !v.is_null())
        .map(format_value)
        .unwrap_or_else(|| "<not set>".to_string());

    Ok(ConfigResult::KeyValue {
        key: path,
        value,
        keys: leaf.keys.clone(),
    })
}

/// Strings unquoted, everything else as compact JSON.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write generated output, creating parent directories.
pub(crate) fn write_output(path: &Path, content: &str) -> Result<(), KeyfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| KeyfigError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| KeyfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
