//! Built-in structural validation of the coerced tree.
//!
//! Every leaf is checked against its declared type, and required leaves with
//! neither a value nor a default are reported as missing. A leaf that fails a
//! check is removed from the tree, so the type's default takes its place and
//! the config can still be built when violations are returned rather than
//! raised. For arrays of config objects, one bad element removes the whole
//! array.
//!
//! Rules beyond structure (ranges, formats, cross-field checks) belong in
//! [`Configurable::validate`](crate::Configurable::validate), which runs on the
//! built instance afterwards.

use serde_json::{Map, Value};

use crate::coerce::field_path;
use crate::error::FieldViolation;
use crate::field::{ArrayElement, FieldType, Primitive};
use crate::schema::{SchemaLeaf, SchemaNode};

/// Options passed through to the built-in checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Do not report required fields that no source set.
    pub skip_missing_fields: bool,
}

/// Check `coerced` against `schema`, removing every leaf that fails.
pub fn validate(
    schema: &SchemaNode,
    coerced: &mut Value,
    options: &ValidatorOptions,
) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    if let SchemaNode::Group { .. } = schema {
        match coerced {
            Value::Object(map) => check_group(schema, map, "", options, &mut violations),
            _ => check_group(schema, &mut Map::new(), "", options, &mut violations),
        }
    }
    violations
}

fn check_group(
    schema: &SchemaNode,
    map: &mut Map<String, Value>,
    path: &str,
    options: &ValidatorOptions,
    violations: &mut Vec<FieldViolation>,
) {
    let Some(children) = schema.children() else {
        return;
    };

    for (name, child) in children {
        let child_path = field_path(path, name);
        match child {
            SchemaNode::Group { optional, .. } => match map.get_mut(name) {
                Some(Value::Object(inner)) => {
                    check_group(child, inner, &child_path, options, violations)
                }
                // An optional section no source touched stays unset.
                _ if *optional => {}
                _ => check_group(child, &mut Map::new(), &child_path, options, violations),
            },
            SchemaNode::Leaf(leaf) => {
                let value = map.get(name);
                if value.is_none_or(Value::is_null) {
                    if leaf.required && leaf.default.is_none() && !options.skip_missing_fields {
                        violations.push(FieldViolation::new(
                            child_path,
                            value.cloned(),
                            "required",
                            "must be set",
                        ));
                    }
                    continue;
                }

                let found = value.map(|v| check_leaf(leaf, v, &child_path, options));
                if let Some(found) = found
                    && !found.is_empty()
                {
                    tracing::debug!(field = %child_path, "dropping invalid value");
                    map.remove(name);
                    violations.extend(found);
                }
            }
        }
    }
}

fn check_leaf(
    leaf: &SchemaLeaf,
    value: &Value,
    path: &str,
    options: &ValidatorOptions,
) -> Vec<FieldViolation> {
    match &leaf.field_type {
        // Nested fields are planned as groups and never reach a leaf.
        FieldType::Raw | FieldType::Nested(_) => Vec::new(),
        FieldType::Primitive(primitive) => check_primitive(*primitive, value, path)
            .into_iter()
            .collect(),
        FieldType::Array(element) => {
            let Value::Array(items) = value else {
                return vec![FieldViolation::new(
                    path,
                    Some(value.clone()),
                    "isArray",
                    "must be an array",
                )];
            };
            let mut found = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                match element {
                    ArrayElement::Primitive(primitive) => {
                        found.extend(check_primitive(*primitive, item, &item_path));
                    }
                    ArrayElement::Class(_) => match (item, leaf.element.as_deref()) {
                        (Value::Object(object), Some(rules)) => {
                            let mut object = object.clone();
                            check_group(rules, &mut object, &item_path, options, &mut found);
                        }
                        (Value::Object(_), None) => {}
                        _ => found.push(FieldViolation::new(
                            item_path,
                            Some(item.clone()),
                            "isObject",
                            "each value must be an object",
                        )),
                    },
                }
            }
            found
        }
    }
}

fn check_primitive(primitive: Primitive, value: &Value, path: &str) -> Option<FieldViolation> {
    let (ok, constraint, message) = match primitive {
        Primitive::String => (value.is_string(), "isString", "must be a string"),
        Primitive::Number => (value.is_number(), "isNumber", "must be a number"),
        Primitive::Integer { .. } => (
            value.is_i64() || value.is_u64(),
            "isInt",
            "must be an integer number",
        ),
        Primitive::Boolean => (value.is_boolean(), "isBoolean", "must be a boolean value"),
    };
    (!ok).then(|| FieldViolation::new(path, Some(value.clone()), constraint, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ClassId;
    use crate::fixtures::test::{RuleConfig, Secret, Server, TestConfig};
    use crate::registry::Registry;
    use crate::schema::plan;
    use serde_json::json;

    fn schema_of<C: crate::Configurable>() -> SchemaNode {
        let registry = Registry::for_class::<C>().unwrap();
        plan(&registry, ClassId::of::<C>(), None).unwrap()
    }

    fn constraints(violations: &[FieldViolation]) -> Vec<(&str, &str)> {
        violations
            .iter()
            .map(|v| (v.path.as_str(), v.constraint.as_str()))
            .collect()
    }

    #[test]
    fn well_typed_tree_passes() {
        let schema = schema_of::<TestConfig>();
        let mut tree = json!({
            "app_port": 8989,
            "debug": true,
            "tasks": ["a"],
            "db": {"host": "h", "auto_reconnect": false},
            "repositories": [{"url": "u", "token": "t", "someFlag": true}],
        });
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn type_mismatch_is_reported_and_pruned() {
        let schema = schema_of::<TestConfig>();
        let mut tree = json!({"app_port": "abc", "debug": true, "db": {"auto_reconnect": "maybe"}});
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        assert_eq!(
            constraints(&violations),
            vec![("app_port", "isNumber"), ("db.auto_reconnect", "isBoolean")]
        );
        assert_eq!(violations[0].value, Some(json!("abc")));
        assert!(tree.get("app_port").is_none());
        assert_eq!(tree["debug"], json!(true));
        assert_eq!(tree["db"], json!({}));
    }

    #[test]
    fn missing_required_without_default() {
        let schema = schema_of::<Secret>();
        let mut tree = json!({});
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        // `label` defaults to "" so only `token` is missing.
        assert_eq!(constraints(&violations), vec![("token", "required")]);
        assert_eq!(violations[0].value, None);

        let skip = ValidatorOptions {
            skip_missing_fields: true,
        };
        assert!(validate(&schema, &mut json!({}), &skip).is_empty());
    }

    #[test]
    fn explicit_null_counts_as_missing() {
        let schema = schema_of::<Secret>();
        let mut tree = json!({"token": null});
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        assert_eq!(violations[0].value, Some(Value::Null));
    }

    #[test]
    fn optional_unset_fields_skip_checks() {
        let schema = schema_of::<RuleConfig>();
        let mut tree = json!({});
        assert!(validate(&schema, &mut tree, &ValidatorOptions::default()).is_empty());
    }

    #[test]
    fn integer_fields_reject_floats() {
        let schema = schema_of::<RuleConfig>();
        let mut tree = json!({"port": 1.5});
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        assert_eq!(constraints(&violations), vec![("port", "isInt")]);
    }

    #[test]
    fn array_elements_are_checked() {
        let schema = schema_of::<RuleConfig>();
        let mut tree = json!({"ratios": [1, "x", 2]});
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        assert_eq!(constraints(&violations), vec![("ratios[1]", "isNumber")]);
        assert!(tree.get("ratios").is_none());
    }

    #[test]
    fn bad_element_field_drops_whole_array() {
        let schema = schema_of::<TestConfig>();
        let mut tree = json!({
            "repositories": [
                {"url": "a", "token": "t", "someFlag": true},
                {"url": "b", "token": "t", "someFlag": "sometimes"},
            ]
        });
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        assert_eq!(
            constraints(&violations),
            vec![("repositories[1].someFlag", "isBoolean")]
        );
        assert!(tree.get("repositories").is_none());
    }

    #[test]
    fn non_object_elements_are_rejected() {
        let schema = schema_of::<TestConfig>();
        let mut tree = json!({"repositories": [5]});
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        assert_eq!(constraints(&violations), vec![("repositories[0]", "isObject")]);
    }

    #[test]
    fn raw_fields_accept_anything() {
        let schema = schema_of::<RuleConfig>();
        let mut tree = json!({"tasks": {"any": ["shape"]}});
        assert!(validate(&schema, &mut tree, &ValidatorOptions::default()).is_empty());
    }

    #[test]
    fn unset_optional_section_is_not_checked() {
        let schema = schema_of::<Server>();
        assert!(validate(&schema, &mut json!({}), &ValidatorOptions::default()).is_empty());

        let mut tree = json!({"tls": {"cert": "c.pem"}});
        let violations = validate(&schema, &mut tree, &ValidatorOptions::default());
        assert_eq!(constraints(&violations), vec![("tls.ca", "required")]);
    }
}
