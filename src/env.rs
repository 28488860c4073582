//! The flat environment map: env files merged under the process environment.
//!
//! Env files are `.env`-style `KEY=value` files parsed with `dotenvy`. They are
//! merged in order (later files override earlier), and the process
//! environment is merged on top, so a real environment variable always wins
//! over a file.
//!
//! Nothing here reads `std::env` directly; the caller passes the process
//! variables in, so tests can use synthetic data.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::KeyfigError;
use crate::file::read_files;

/// Read env files, skipping missing ones unless `fail_on_missing`.
pub fn read_env_files(
    paths: &[PathBuf],
    fail_on_missing: bool,
) -> Result<Vec<(PathBuf, String)>, KeyfigError> {
    read_files(paths, fail_on_missing)
}

/// Parse one env file's content into ordered `KEY → value` pairs.
pub fn parse_env_file(
    path: &PathBuf,
    content: &str,
) -> Result<IndexMap<String, String>, KeyfigError> {
    dotenvy::from_read_iter(content.as_bytes())
        .map(|item| {
            item.map_err(|e| KeyfigError::Parse {
                path: path.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Build the env lookup map: env files first (in order), process vars on top.
pub fn env_map(
    env_files: &[(PathBuf, String)],
    process_vars: impl IntoIterator<Item = (String, String)>,
) -> Result<IndexMap<String, String>, KeyfigError> {
    let mut map = IndexMap::new();
    for (path, content) in env_files {
        map.extend(parse_env_file(path, content)?);
    }
    map.extend(process_vars);
    Ok(map)
}
