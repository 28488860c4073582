//! The schema tree and the raw-value collector.
//!
//! Resolution walks a config type's fields twice over the same recursion:
//!
//! 1. [`plan`] turns registry entries into a [`SchemaNode`] tree. Every leaf
//!    knows its key in each source, its declared type, and its default. This
//!    pass reads no sources, so the CLI parser can be configured from the
//!    planned keys before argv is parsed.
//! 2. [`collect`] looks every leaf up in the materialized sources and keeps
//!    the winner under the priority list, producing the raw-value tree.
//!
//! Both trees are keyed by field name, so the raw tree has the shape of the
//! config struct, not the shape of any one source.
//!
//! # Key composition
//!
//! A leaf's generic key is `<prefix>.<namespace>.<generic_key>`, where
//! `prefix` is the enclosing nested keys (and the top-level prefix at the
//! root), and `namespace` is the declaring type's namespace. Empty segments
//! are skipped. Each source's key is the explicit override if declared,
//! otherwise derived from the generic key with [`derive_key`].
//!
//! Two fields that derive the same key both read that key; nothing is
//! deduplicated.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::KeyfigError;
use crate::field::{ArrayElement, ClassId, ClassRef, FieldType};
use crate::keys::{derive_key, join_segments};
use crate::merge::get_path;
use crate::priority::{Lookup, pick};
use crate::registry::{FieldDescriptor, Registry};
use crate::types::SourceKind;

/// The key a leaf is read from in each source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKeys {
    pub file: String,
    pub env: String,
    pub cli: String,
}

impl SourceKeys {
    pub fn get(&self, source: SourceKind) -> &str {
        match source {
            SourceKind::File => &self.file,
            SourceKind::Env => &self.env,
            SourceKind::Cli => &self.cli,
        }
    }
}

/// One resolvable config value.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaLeaf {
    pub keys: SourceKeys,
    pub field_type: FieldType,
    /// From the type's `Default` instance; `None` when that is `null`.
    pub default: Option<Value>,
    pub required: bool,
    pub array_separator: String,
    pub lenient: Option<bool>,
    /// Field rules of the element type, for arrays of config objects.
    pub element: Option<Box<SchemaNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// A config type: its fields in declaration order. `optional` is set for
    /// a nested field declared optional, which may stay unset as a whole.
    Group {
        children: IndexMap<String, SchemaNode>,
        optional: bool,
    },
    Leaf(SchemaLeaf),
}

impl SchemaNode {
    pub fn children(&self) -> Option<&IndexMap<String, SchemaNode>> {
        match self {
            SchemaNode::Group { children, .. } => Some(children),
            SchemaNode::Leaf(_) => None,
        }
    }

    /// Every leaf with its dotted field path, depth-first in declaration order.
    pub fn leaves(&self) -> Vec<(String, &SchemaLeaf)> {
        let mut out = Vec::new();
        collect_leaves(self, "", &mut out);
        out
    }

    /// Whether any leaf below this node is required. An optional group never is.
    pub fn is_required(&self) -> bool {
        match self {
            SchemaNode::Leaf(leaf) => leaf.required,
            SchemaNode::Group { children, optional } => {
                !optional && children.values().any(SchemaNode::is_required)
            }
        }
    }
}

fn collect_leaves<'a>(node: &'a SchemaNode, path: &str, out: &mut Vec<(String, &'a SchemaLeaf)>) {
    match node {
        SchemaNode::Leaf(leaf) => out.push((path.to_string(), leaf)),
        SchemaNode::Group { children, .. } => {
            for (name, child) in children {
                let child_path = join_segments([Some(path), Some(name.as_str())]);
                collect_leaves(child, &child_path, out);
            }
        }
    }
}

/// Every CLI key in the schema, in declaration order.
pub fn cli_keys(schema: &SchemaNode) -> Vec<String> {
    schema
        .leaves()
        .into_iter()
        .map(|(_, leaf)| leaf.keys.cli.clone())
        .collect()
}

/// The three materialized sources, built once per resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSources {
    /// Merged structured-file tree.
    pub file: Value,
    /// Flat environment map.
    pub env: IndexMap<String, String>,
    /// Tree built from CLI arguments and programmatic overrides.
    pub cli: Value,
}

impl ResolvedSources {
    fn lookup(&self, source: SourceKind, keys: &SourceKeys) -> Option<Value> {
        match source {
            SourceKind::File => get_path(&self.file, &keys.file).cloned(),
            SourceKind::Env => self.env.get(&keys.env).cloned().map(Value::String),
            SourceKind::Cli => get_path(&self.cli, &keys.cli).cloned(),
        }
    }
}

/// The raw-value tree together with the schema it was collected under.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConfig {
    pub raw_values: Value,
    pub schema: SchemaNode,
}

/// Plan `class` and collect its raw values in one call.
pub fn build(
    registry: &Registry,
    class: ClassId,
    sources: &ResolvedSources,
    priority: &[SourceKind],
    prefix: Option<&str>,
) -> Result<RawConfig, KeyfigError> {
    let schema = plan(registry, class, prefix)?;
    let raw_values = collect(&schema, sources, priority);
    Ok(RawConfig { raw_values, schema })
}

/// Build the schema tree for `class` under an optional enclosing prefix.
pub fn plan(
    registry: &Registry,
    class: ClassId,
    prefix: Option<&str>,
) -> Result<SchemaNode, KeyfigError> {
    let class_ref = *registry
        .class(class)
        .ok_or_else(|| unregistered("<root>", "type is not registered"))?;
    let defaults = class_defaults(&class_ref)?;
    plan_class(registry, &class_ref, prefix.unwrap_or(""), &defaults, false)
}

fn plan_class(
    registry: &Registry,
    class: &ClassRef,
    prefix: &str,
    defaults: &Value,
    optional: bool,
) -> Result<SchemaNode, KeyfigError> {
    let namespace = registry.namespace(class.id());
    let mut children = IndexMap::new();

    for field in registry.fields(class.id()) {
        let field_default = defaults.get(&field.name);
        let node = match &field.field_type {
            FieldType::Nested(child) => {
                let child_prefix =
                    join_segments([Some(prefix), namespace, Some(field.nested_key.as_str())]);
                // An unset `Option<T>` defaults to `null`; its leaves take
                // their defaults from `T` itself.
                let child_defaults = match field_default {
                    Some(v @ Value::Object(_)) => v.clone(),
                    _ => class_defaults(child)?,
                };
                plan_class(registry, child, &child_prefix, &child_defaults, field.optional)?
            }
            _ => {
                let full = join_segments([Some(prefix), namespace, Some(field.generic_key.as_str())]);
                SchemaNode::Leaf(plan_leaf(registry, field, &full, field_default)?)
            }
        };
        children.insert(field.name.clone(), node);
    }

    Ok(SchemaNode::Group { children, optional })
}

fn plan_leaf(
    registry: &Registry,
    field: &FieldDescriptor,
    full_key: &str,
    default: Option<&Value>,
) -> Result<SchemaLeaf, KeyfigError> {
    let key_for = |source: SourceKind, explicit: &Option<String>| {
        explicit
            .clone()
            .unwrap_or_else(|| derive_key(full_key, source))
    };
    let keys = SourceKeys {
        file: key_for(SourceKind::File, &field.overrides.file),
        env: key_for(SourceKind::Env, &field.overrides.env),
        cli: key_for(SourceKind::Cli, &field.overrides.cli),
    };

    let element = match &field.field_type {
        FieldType::Array(ArrayElement::Class(element)) => {
            let defaults = class_defaults(element)?;
            Some(Box::new(plan_class(registry, element, "", &defaults, false)?))
        }
        _ => None,
    };

    Ok(SchemaLeaf {
        keys,
        field_type: field.field_type.clone(),
        default: default.filter(|v| !v.is_null()).cloned(),
        required: !field.optional,
        array_separator: field.array_separator.clone(),
        lenient: field.lenient,
        element,
    })
}

fn class_defaults(class: &ClassRef) -> Result<Value, KeyfigError> {
    class.defaults().map_err(|e| KeyfigError::Instantiate {
        class: class.name().to_string(),
        reason: format!("default instance does not serialize: {e}"),
    })
}

fn unregistered(class: &str, reason: &str) -> KeyfigError {
    KeyfigError::MissingTypeMetadata {
        class: class.to_string(),
        field: "*".into(),
        reason: reason.into(),
    }
}

/// Look every leaf up in `sources` and keep the winner under `priority`.
///
/// Absent leaves are omitted from the tree; an explicit `null` is kept as
/// `null`. A nested group with nothing collected under it is omitted too, so
/// the field keeps its default. The root is always an object.
pub fn collect(schema: &SchemaNode, sources: &ResolvedSources, priority: &[SourceKind]) -> Value {
    match schema {
        SchemaNode::Group { children, .. } => {
            let mut map = Map::new();
            for (name, child) in children {
                match child {
                    SchemaNode::Group { .. } => {
                        let group = collect(child, sources, priority);
                        if group.as_object().is_some_and(|m| !m.is_empty()) {
                            map.insert(name.clone(), group);
                        }
                    }
                    SchemaNode::Leaf(leaf) => {
                        if let Some(value) = collect_leaf(leaf, sources, priority) {
                            map.insert(name.clone(), value);
                        }
                    }
                }
            }
            Value::Object(map)
        }
        SchemaNode::Leaf(leaf) => collect_leaf(leaf, sources, priority).unwrap_or(Value::Null),
    }
}

fn collect_leaf(
    leaf: &SchemaLeaf,
    sources: &ResolvedSources,
    priority: &[SourceKind],
) -> Option<Value> {
    let found: Vec<(SourceKind, Option<Value>)> = SourceKind::ALL
        .iter()
        .map(|&source| (source, sources.lookup(source, &leaf.keys)))
        .collect();
    let lookups: Vec<(SourceKind, Lookup<'_>)> = found
        .iter()
        .map(|(source, value)| (*source, Lookup::from_option(value.as_ref())))
        .collect();

    let winner = pick(&lookups, priority);
    if !winner.is_absent() {
        tracing::trace!(key = %leaf.keys.file, "resolved config value");
    }
    winner.into_value()
}
