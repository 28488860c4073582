//! Programmatic CLI-source overrides.
//!
//! Overrides are `(dotted_key, value)` pairs that land in the CLI source tree
//! alongside parsed arguments. Explicit overrides are always kept. Overrides
//! matched from a serializable source (a clap struct, a map) are kept only
//! when their key names a config field, either by its CLI key or by its
//! dotted field path.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::merge::set_path;
use crate::schema::SchemaNode;

/// One override destined for the CLI source.
#[derive(Debug, Clone, PartialEq)]
pub struct CliOverride {
    pub key: String,
    pub value: Value,
    /// Drop this override unless `key` names a config field.
    pub only_if_known: bool,
}

impl CliOverride {
    pub fn explicit(key: &str, value: Value) -> Self {
        Self {
            key: key.to_string(),
            value,
            only_if_known: false,
        }
    }

    pub fn matched(key: String, value: Value) -> Self {
        Self {
            key,
            value,
            only_if_known: true,
        }
    }
}

/// Convert dotted-key pairs into a nested tree.
///
/// `("db.mysql.host", "h")` becomes `{db: {mysql: {host: "h"}}}`. If several
/// entries target the same key, the last one wins.
pub fn overrides_to_tree(entries: &[(String, Value)]) -> Value {
    let mut tree = Map::new();
    for (dotted_key, value) in entries {
        set_path(&mut tree, dotted_key, value.clone());
    }
    Value::Object(tree)
}

/// Flatten a serialized value into dotted leaf pairs, skipping `null`s.
///
/// Objects are recursed into; arrays and scalars are leaves.
pub fn flatten_value(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(value, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                let dotted = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(child, &dotted, out);
            }
        }
        other if !prefix.is_empty() => out.push((prefix.to_string(), other.clone())),
        _ => {}
    }
}

/// Map every name a caller may use for a field to its CLI key: the CLI key
/// itself and the dotted field path.
pub fn known_keys(schema: &SchemaNode) -> HashMap<String, String> {
    let mut keys = HashMap::new();
    for (path, leaf) in schema.leaves() {
        keys.insert(path, leaf.keys.cli.clone());
        keys.insert(leaf.keys.cli.clone(), leaf.keys.cli.clone());
    }
    keys
}

/// Resolve overrides against the schema: explicit ones are kept as given,
/// matched ones are renamed to their CLI key or dropped.
pub fn select(overrides: &[CliOverride], schema: &SchemaNode) -> Vec<(String, Value)> {
    let known = known_keys(schema);
    overrides
        .iter()
        .filter_map(|o| {
            if !o.only_if_known {
                return Some((o.key.clone(), o.value.clone()));
            }
            match known.get(&o.key) {
                Some(cli_key) => Some((cli_key.clone(), o.value.clone())),
                None => {
                    tracing::trace!(key = %o.key, "ignoring override with no matching field");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ClassId;
    use crate::fixtures::test::TestConfig;
    use crate::registry::Registry;
    use crate::schema::plan;
    use serde_json::json;

    fn entries(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn schema() -> SchemaNode {
        let registry = Registry::for_class::<TestConfig>().unwrap();
        plan(&registry, ClassId::of::<TestConfig>(), None).unwrap()
    }

    #[test]
    fn flat_and_nested_keys() {
        let tree = overrides_to_tree(&entries(&[
            ("debug", json!("true")),
            ("db.mysql.host", json!("h")),
            ("db.mysql.poolSize", json!(20)),
        ]));
        assert_eq!(
            tree,
            json!({"debug": "true", "db": {"mysql": {"host": "h", "poolSize": 20}}})
        );
    }

    #[test]
    fn empty_list_empty_tree() {
        assert_eq!(overrides_to_tree(&[]), json!({}));
    }

    #[test]
    fn last_entry_wins_for_same_key() {
        let tree = overrides_to_tree(&entries(&[("app.port", json!(3000)), ("app.port", json!(5000))]));
        assert_eq!(tree["app"]["port"], json!(5000));
    }

    #[test]
    fn flatten_skips_nulls_and_keeps_arrays() {
        let value = json!({"host": null, "port": 1, "db": {"url": "pg://", "pool": null}, "tags": ["a"]});
        assert_eq!(
            flatten_value(&value),
            vec![
                ("port".to_string(), json!(1)),
                ("db.url".to_string(), json!("pg://")),
                ("tags".to_string(), json!(["a"])),
            ]
        );
    }

    #[test]
    fn select_keeps_explicit_overrides() {
        let overrides = vec![CliOverride::explicit("anything.at.all", json!(1))];
        assert_eq!(
            select(&overrides, &schema()),
            entries(&[("anything.at.all", json!(1))])
        );
    }

    #[test]
    fn select_matches_by_cli_key_or_field_path() {
        let overrides = vec![
            CliOverride::matched("app.port".into(), json!(1)),
            CliOverride::matched("app_host".into(), json!("h")),
            CliOverride::matched("db.pool_size".into(), json!(3)),
            CliOverride::matched("verbose".into(), json!(true)),
        ];
        assert_eq!(
            select(&overrides, &schema()),
            entries(&[
                ("app.port", json!(1)),
                ("app.host", json!("h")),
                ("db.mysql.poolSize", json!(3)),
            ])
        );
    }
}
