//! Clap integration for keyfig.
//!
//! This module is compiled only when the `clap` Cargo feature is enabled (on
//! by default). It does two separate jobs:
//!
//! - **Argument source.** [`parse_args`] reads config values out of an
//!   argument vector. The accepted flags are the CLI keys of the config type,
//!   so the parser is built at runtime from the planned schema. Every key
//!   becomes a `--<key>` long flag that takes an optional value: `--a.b=1`
//!   and `--a.b 1` both produce `("a.b", "1")`, and a bare `--a.b` produces
//!   `"true"`. Tokens that are not known config flags are ignored, so the
//!   same argv can be handed to the application's own parser.
//!
//! - **Config subcommands.** [`ConfigArgs`] and [`ConfigSubcommand`] are
//!   derive types to embed in an application's clap parser for
//!   `config list|get|schema|doc`. [`ConfigArgs::into_action()`] converts them
//!   into a framework-agnostic [`ConfigAction`](crate::ConfigAction), handled
//!   by [`KeyfigBuilder::handle()`](crate::KeyfigBuilder::handle).

use std::path::PathBuf;

use clap::{Arg, ArgAction, Args, Command, Subcommand};
use indexmap::IndexSet;
use serde_json::Value;

use crate::error::KeyfigError;
use crate::types::{ConfigAction, SourceKind};

/// Parse config flags out of `args` (without the program name).
///
/// Returns `(cli_key, value)` pairs with string values, in key order. Only
/// flags named after a key in `keys` are considered; everything else,
/// including positional arguments, is skipped.
pub fn parse_args(keys: &[String], args: &[String]) -> Result<Vec<(String, Value)>, KeyfigError> {
    let keys: IndexSet<&str> = keys
        .iter()
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .collect();
    let tokens = known_tokens(&keys, args);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut command = Command::new("keyfig")
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true);
    for key in &keys {
        command = command.arg(
            Arg::new(key.to_string())
                .long(key.to_string())
                .num_args(0..=1)
                .default_missing_value("true")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(String))
                .action(ArgAction::Set),
        );
    }

    let matches = command
        .try_get_matches_from(&tokens)
        .map_err(|e| KeyfigError::InvalidArgs(e.to_string()))?;

    let pairs: Vec<(String, Value)> = keys
        .iter()
        .filter_map(|key| {
            matches
                .get_one::<String>(key)
                .map(|value| (key.to_string(), Value::String(value.clone())))
        })
        .collect();
    tracing::debug!(count = pairs.len(), "parsed config flags from arguments");
    Ok(pairs)
}

/// Keep `--<key>` / `--<key>=v` tokens for known keys, plus the value token
/// following a bare known flag.
fn known_tokens(keys: &IndexSet<&str>, args: &[String]) -> Vec<String> {
    let mut kept = Vec::new();
    let mut iter = args.iter().peekable();
    while let Some(token) = iter.next() {
        let Some(body) = token.strip_prefix("--") else {
            continue;
        };
        let (name, inline_value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        if !keys.contains(name) {
            continue;
        }
        kept.push(token.clone());
        if inline_value.is_none()
            && let Some(next) = iter.next_if(|next| !next.starts_with("--"))
        {
            kept.push(next.clone());
        }
    }
    kept
}

fn parse_source_kind(s: &str) -> Result<SourceKind, String> {
    s.parse().map_err(|e: KeyfigError| e.to_string())
}

/// Clap-derived args for the `config` subcommand group.
///
/// Embed this into your app's clap derive:
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(subcommand)]
///     command: Commands,
/// }
///
/// #[derive(Subcommand)]
/// enum Commands {
///     Config(ConfigArgs),
/// }
/// ```
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

/// Available config subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigSubcommand {
    /// Show every resolved configuration value.
    List,
    /// Show one resolved value and the keys it is read from.
    Get {
        /// Dotted field path or file key (e.g. "db.host").
        key: String,
    },
    /// Print the JSON Schema of the configuration.
    Schema {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a Markdown reference of the configuration.
    Doc {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Which source's keys to document: file, env, or cli.
        #[arg(long, default_value = "file", value_parser = parse_source_kind)]
        source: SourceKind,
    },
}

impl ConfigArgs {
    /// Convert clap-parsed args into a framework-agnostic `ConfigAction`.
    ///
    /// Bare `config` (no subcommand) and explicit `config list` both map to
    /// `ConfigAction::List`.
    pub fn into_action(self) -> ConfigAction {
        match self.action {
            None | Some(ConfigSubcommand::List) => ConfigAction::List,
            Some(ConfigSubcommand::Get { key }) => ConfigAction::Get { key },
            Some(ConfigSubcommand::Schema { output }) => ConfigAction::Schema { output },
            Some(ConfigSubcommand::Doc { output, source }) => ConfigAction::Doc { output, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    /// Wrapper so we can use `try_parse_from` on the subcommand.
    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    fn parse(args: &[&str]) -> ConfigArgs {
        TestCli::try_parse_from(args).unwrap().config
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn keys() -> Vec<String> {
        strings(&["app.port", "debug", "db.mysql.host", "tasks"])
    }

    #[test]
    fn equals_and_space_forms() {
        let pairs = parse_args(&keys(), &strings(&["--app.port=8989", "--db.mysql.host", "h"])).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("app.port".to_string(), json!("8989")),
                ("db.mysql.host".to_string(), json!("h")),
            ]
        );
    }

    #[test]
    fn bare_flag_is_true() {
        let pairs = parse_args(&keys(), &strings(&["--debug", "--app.port", "1"])).unwrap();
        assert_eq!(pairs[0], ("app.port".to_string(), json!("1")));
        assert_eq!(pairs[1], ("debug".to_string(), json!("true")));
    }

    #[test]
    fn unknown_flags_and_positionals_are_ignored() {
        let args = strings(&["run", "--verbose", "--output", "x", "--tasks=a,b", "file.txt"]);
        let pairs = parse_args(&keys(), &args).unwrap();
        assert_eq!(pairs, vec![("tasks".to_string(), json!("a,b"))]);
    }

    #[test]
    fn negative_numbers_are_values() {
        let pairs = parse_args(&keys(), &strings(&["--app.port", "-1"])).unwrap();
        assert_eq!(pairs, vec![("app.port".to_string(), json!("-1"))]);
    }

    #[test]
    fn repeated_flag_last_wins() {
        let pairs = parse_args(&keys(), &strings(&["--app.port=1", "--app.port=2"])).unwrap();
        assert_eq!(pairs, vec![("app.port".to_string(), json!("2"))]);
    }

    #[test]
    fn duplicate_keys_are_tolerated() {
        let keys = strings(&["host", "host"]);
        let pairs = parse_args(&keys, &strings(&["--host=x"])).unwrap();
        assert_eq!(pairs, vec![("host".to_string(), json!("x"))]);
    }

    #[test]
    fn no_args_no_pairs() {
        assert!(parse_args(&keys(), &[]).unwrap().is_empty());
    }

    // --- config subcommands ---

    #[test]
    fn parse_bare_config_is_list() {
        assert_eq!(parse(&["test"]).into_action(), ConfigAction::List);
    }

    #[test]
    fn parse_explicit_list() {
        assert_eq!(parse(&["test", "list"]).into_action(), ConfigAction::List);
    }

    #[test]
    fn parse_get() {
        let action = parse(&["test", "get", "db.host"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Get {
                key: "db.host".into()
            }
        );
    }

    #[test]
    fn parse_schema_with_output() {
        let action = parse(&["test", "schema", "-o", "schema.json"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Schema {
                output: Some(PathBuf::from("schema.json"))
            }
        );
    }

    #[test]
    fn parse_doc_defaults_to_file_keys() {
        let action = parse(&["test", "doc"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Doc {
                output: None,
                source: SourceKind::File
            }
        );
    }

    #[test]
    fn parse_doc_with_source() {
        let action = parse(&["test", "doc", "--source", "env", "--output", "ENV.md"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Doc {
                output: Some(PathBuf::from("ENV.md")),
                source: SourceKind::Env
            }
        );
    }

    #[test]
    fn invalid_source_errors() {
        assert!(TestCli::try_parse_from(["test", "doc", "--source", "redis"]).is_err());
    }

    #[test]
    fn invalid_subcommand_errors() {
        assert!(TestCli::try_parse_from(["test", "nope"]).is_err());
    }
}
