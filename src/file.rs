//! Structured config files: reading, parsing, and merging.
//!
//! Files are read in the order given, which is also their priority order:
//! later files override earlier ones key-by-key when merged. The parser is
//! picked by extension:
//!
//! | Extension          | Parser       |
//! |--------------------|--------------|
//! | `.toml`            | `toml`       |
//! | `.json`            | `serde_json` |
//! | anything else      | `serde_yaml` |
//!
//! A missing file is skipped unless the caller marks missing files as fatal.
//! Every other I/O error, and every parse error, is propagated.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::KeyfigError;
use crate::merge::deep_merge;

/// Read every file that exists, in order.
///
/// Returns `(path, content)` pairs. With `fail_on_missing`, a missing file is
/// an [`Io`](KeyfigError::Io) error instead of being skipped.
pub fn read_files(
    paths: &[PathBuf],
    fail_on_missing: bool,
) -> Result<Vec<(PathBuf, String)>, KeyfigError> {
    let mut results = Vec::new();
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "read config file");
                results.push((path.clone(), content));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !fail_on_missing => {
                tracing::debug!(path = %path.display(), "config file not found, skipping");
                continue;
            }
            Err(e) => {
                return Err(KeyfigError::Io {
                    path: path.clone(),
                    source: e,
                });
            }
        }
    }
    Ok(results)
}

/// Parse one file's content into a mapping.
///
/// An empty document is an empty mapping; any other non-mapping top level is
/// a parse error.
pub fn parse_document(path: &Path, content: &str) -> Result<Map<String, Value>, KeyfigError> {
    let parse_err = |reason: String| KeyfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let value: Value = match extension.as_deref() {
        Some("toml") => toml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
        Some("json") => serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?,
        _ => serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(parse_err(format!(
            "top level must be a mapping, found {}",
            kind_name(&other)
        ))),
    }
}

/// Parse every file and deep-merge them in order into one tree.
pub fn merge_documents(files: &[(PathBuf, String)]) -> Result<Value, KeyfigError> {
    let mut merged = Map::new();
    for (path, content) in files {
        merged = deep_merge(merged, parse_document(path, content)?);
    }
    Ok(Value::Object(merged))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
