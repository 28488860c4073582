//! Schema and documentation emitters.
//!
//! Both are built from the planned [`SchemaNode`] tree and never look at
//! source values.
//!
//! - [`json_schema`] produces a draft-07 JSON Schema whose properties are
//!   nested by each leaf's **file** key, so it describes the layout of the
//!   config file. Every leaf also carries a `configKeys` object naming its
//!   key in each source.
//! - [`markdown`] produces a reference page: a YAML example of the file
//!   layout followed by one line per value, keyed by the chosen source.

use std::path::PathBuf;

use serde_json::{Map, Value, json};

use crate::error::KeyfigError;
use crate::field::{ArrayElement, FieldType};
use crate::merge::set_path;
use crate::schema::{SchemaLeaf, SchemaNode};
use crate::types::SourceKind;

const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// The JSON Schema document for a schema tree.
pub fn json_schema(schema: &SchemaNode) -> Value {
    let mut root = Map::new();
    root.insert("$schema".into(), Value::String(DRAFT_07.into()));
    root.extend(object_schema(schema));
    Value::Object(root)
}

/// [`json_schema`] rendered as pretty-printed JSON.
pub fn json_schema_string(schema: &SchemaNode) -> Result<String, KeyfigError> {
    serde_json::to_string_pretty(&json_schema(schema)).map_err(|e| KeyfigError::Render {
        what: "JSON schema".into(),
        reason: e.to_string(),
    })
}

fn object_schema(schema: &SchemaNode) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert("type".into(), json!("object"));
    object.insert("properties".into(), Value::Object(Map::new()));
    for (_, leaf) in schema.leaves() {
        let segments: Vec<&str> = leaf.keys.file.split('.').collect();
        insert_property(&mut object, &segments, leaf_schema(leaf), leaf.required);
    }
    object
}

fn leaf_schema(leaf: &SchemaLeaf) -> Value {
    let mut out = Map::new();
    if !matches!(leaf.field_type, FieldType::Raw) {
        out.insert("type".into(), json!(leaf.field_type.type_name()));
    }
    match (&leaf.field_type, leaf.element.as_deref()) {
        (FieldType::Array(ArrayElement::Primitive(p)), _) => {
            out.insert("items".into(), json!({"type": p.type_name()}));
        }
        (FieldType::Array(ArrayElement::Class(_)), Some(element)) => {
            out.insert("items".into(), Value::Object(object_schema(element)));
        }
        _ => {}
    }
    out.insert(
        "configKeys".into(),
        json!({
            "file": leaf.keys.file,
            "env": leaf.keys.env,
            "cli": leaf.keys.cli,
        }),
    );
    if let Some(default) = &leaf.default {
        out.insert("default".into(), default.clone());
    }
    Value::Object(out)
}

/// Place `property` at the path `segments` under `node`, creating object
/// schemas along the way. A required leaf makes every enclosing object
/// required too.
fn insert_property(
    node: &mut Map<String, Value>,
    segments: &[&str],
    property: Value,
    required: bool,
) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if !node.contains_key("properties") {
        node.insert("properties".into(), Value::Object(Map::new()));
    }
    if required {
        mark_required(node, first);
    }
    let Some(Value::Object(properties)) = node.get_mut("properties") else {
        return;
    };

    if rest.is_empty() {
        properties.insert(first.to_string(), property);
        return;
    }
    let child = properties
        .entry(first.to_string())
        .or_insert_with(|| json!({"type": "object"}));
    if let Value::Object(child) = child {
        insert_property(child, rest, property, required);
    }
}

fn mark_required(node: &mut Map<String, Value>, name: &str) {
    let list = node
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(names) = list
        && !names.iter().any(|n| n == name)
    {
        names.push(Value::String(name.to_string()));
    }
}

/// Options for the Markdown reference.
#[derive(Debug, Clone, PartialEq)]
pub struct DocOptions {
    pub title: String,
    /// Whose keys the reference lists.
    pub source: SourceKind,
    /// Also write the page to this path.
    pub write_to_file: Option<PathBuf>,
}

impl Default for DocOptions {
    fn default() -> Self {
        Self {
            title: "Configuration".into(),
            source: SourceKind::File,
            write_to_file: None,
        }
    }
}

/// Render the Markdown reference, writing it out if requested.
pub fn markdown(schema: &SchemaNode, options: &DocOptions) -> Result<String, KeyfigError> {
    let example = serde_yaml::to_string(&example_tree(schema)).map_err(|e| KeyfigError::Render {
        what: "YAML example".into(),
        reason: e.to_string(),
    })?;

    let mut out = format!("# {}\n\n## Example\n\n```yaml\n{example}```\n\n", options.title);
    out.push_str(&format!("## Reference ({})\n\n", options.source));
    for (_, leaf) in schema.leaves() {
        out.push_str(&reference_line(leaf, options.source));
        out.push('\n');
    }

    if let Some(path) = &options.write_to_file {
        crate::ops::write_output(path, &out)?;
        tracing::debug!(path = %path.display(), "wrote config reference");
    }
    Ok(out)
}

/// The file layout with every leaf set to its default (or `null`).
fn example_tree(schema: &SchemaNode) -> Value {
    let mut tree = Map::new();
    for (_, leaf) in schema.leaves() {
        set_path(
            &mut tree,
            &leaf.keys.file,
            leaf.default.clone().unwrap_or(Value::Null),
        );
    }
    Value::Object(tree)
}

fn reference_line(leaf: &SchemaLeaf, source: SourceKind) -> String {
    let key = match source {
        SourceKind::Cli => format!("--{}", leaf.keys.cli),
        other => leaf.keys.get(other).to_string(),
    };
    let status = match (&leaf.default, leaf.required) {
        (Some(default), _) => format!("default `{default}`"),
        (None, true) => "**required**".to_string(),
        (None, false) => "optional".to_string(),
    };
    format!("- `{key}` ({}): {status}", leaf.field_type.type_name())
}
