//! Small shared types: source kinds and framework-agnostic config actions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeyfigError;

/// One of the three origins of configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Structured config files (YAML, TOML, JSON).
    File,
    /// Process environment, plus any loaded env files.
    Env,
    /// Command-line arguments and programmatic overrides.
    Cli,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::File, SourceKind::Env, SourceKind::Cli];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Env => "env",
            SourceKind::Cli => "cli",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = KeyfigError;

    /// Accepts `yaml` as an alias for `file`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "yaml" => Ok(SourceKind::File),
            "env" => Ok(SourceKind::Env),
            "cli" => Ok(SourceKind::Cli),
            _ => Err(KeyfigError::UnknownSourceKind(s.to_string())),
        }
    }
}

/// The default priority list. The last entry wins, so CLI overrides env
/// overrides file.
pub fn default_priority() -> Vec<SourceKind> {
    vec![SourceKind::File, SourceKind::Env, SourceKind::Cli]
}

/// A config operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Every resolved leaf with its value.
    List,
    /// One resolved leaf by its dotted field path.
    Get { key: String },
    /// JSON-Schema document, to stdout or a file.
    Schema { output: Option<PathBuf> },
    /// Markdown reference keyed by `source`, to stdout or a file.
    Doc {
        output: Option<PathBuf>,
        source: SourceKind,
    },
}
