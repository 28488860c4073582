use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unknown source kind '{0}' (expected one of: file, env, cli)")]
    UnknownSourceKind(String),

    #[error("Cannot coerce '{path}': {reason}. Got value \"{value}\"")]
    Coercion {
        path: String,
        value: String,
        reason: String,
    },

    #[error("Validation failed:\n{0}")]
    Validation(ValidationErrors),

    #[error("Missing type metadata for '{class}.{field}': {reason}")]
    MissingTypeMetadata {
        class: String,
        field: String,
        reason: String,
    },

    #[error("Failed to build {class} from resolved values: {reason}")]
    Instantiate { class: String, reason: String },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid command-line arguments: {0}")]
    InvalidArgs(String),

    #[error("Failed to render {what}: {reason}")]
    Render { what: String, reason: String },
}

impl KeyfigError {
    /// True for failures reading or parsing a config file or env file.
    pub fn is_source_load(&self) -> bool {
        matches!(self, KeyfigError::Io { .. } | KeyfigError::Parse { .. })
    }

    pub(crate) fn coercion(path: &str, value: &Value, reason: impl Into<String>) -> Self {
        KeyfigError::Coercion {
            path: path.to_string(),
            value: display_value(value),
            reason: reason.into(),
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Dotted field path, with `[i]` segments for array elements
    /// (e.g. `repositories[0].url`).
    pub path: String,
    /// The value that was received, if any.
    pub value: Option<Value>,
    /// Short constraint name, e.g. `isNumber` or `required`.
    pub constraint: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        path: impl Into<String>,
        value: Option<Value>,
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            value,
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let received = match &self.value {
            Some(v) => display_value(v),
            None => "undefined".to_string(),
        };
        write!(
            f,
            "{}: {} ({}). Got value \"{received}\"",
            self.path, self.message, self.constraint
        )
    }
}

/// Every violation found while validating one resolved config.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(pub Vec<FieldViolation>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Render a value the way a user typed it: strings unquoted, everything else as JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
