//! Coercion of raw source values into the declared field types.
//!
//! Env vars and CLI flags only ever produce strings, while files produce
//! whatever their format can express. Coercion normalizes both into the JSON
//! shape serde expects for the field:
//!
//! | Declared type        | Accepted input                                          |
//! |----------------------|---------------------------------------------------------|
//! | `Number`             | numbers; strings parsed as `i64`, then `u64`, then `f64`  |
//! | `Integer { radix }`  | numbers; strings parsed with the radix                  |
//! | `Boolean`            | booleans; exactly `"true"` or `"false"`                 |
//! | `String`             | anything (the validator checks the type)                |
//! | array of primitive   | sequences; strings split on the field separator         |
//! | array of objects     | sequences; strings split on the field separator, each   |
//! |                      | element `key=value` pairs joined with `;`               |
//! | `Raw`                | anything, untouched                                     |
//!
//! A string that does not parse is a [`Coercion`](KeyfigError::Coercion)
//! error in strict mode and is passed through unchanged in lenient mode, where
//! the validator reports it instead. Input of the wrong shape (a boolean for a
//! number, an object for an array) is always an error. `null` is never
//! coerced.

use serde_json::{Map, Number, Value};

use crate::error::KeyfigError;
use crate::field::{ArrayElement, FieldType, Primitive};
use crate::merge::overlay_values;
use crate::schema::{SchemaLeaf, SchemaNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoerceOptions {
    /// Fail on unparseable strings. Fields may override this.
    pub strict: bool,
    /// Overlay array-of-object elements onto the element type's defaults.
    pub expose_defaults: bool,
}

impl Default for CoerceOptions {
    fn default() -> Self {
        Self {
            strict: true,
            expose_defaults: true,
        }
    }
}

/// Coerce a raw-value tree collected under `schema`.
pub fn coerce_tree(
    schema: &SchemaNode,
    raw: &Value,
    options: &CoerceOptions,
) -> Result<Value, KeyfigError> {
    coerce_node(schema, raw, "", options)
}

fn coerce_node(
    schema: &SchemaNode,
    raw: &Value,
    path: &str,
    options: &CoerceOptions,
) -> Result<Value, KeyfigError> {
    match schema {
        SchemaNode::Leaf(leaf) => coerce_leaf(leaf, raw, path, options),
        SchemaNode::Group { children, .. } => {
            let Value::Object(raw_map) = raw else {
                return Ok(raw.clone());
            };
            // Keys the schema does not know are kept for serde to judge.
            let mut out = raw_map.clone();
            for (name, child) in children {
                if let Some(value) = raw_map.get(name) {
                    let child_path = field_path(path, name);
                    out.insert(name.clone(), coerce_node(child, value, &child_path, options)?);
                }
            }
            Ok(Value::Object(out))
        }
    }
}

fn coerce_leaf(
    leaf: &SchemaLeaf,
    value: &Value,
    path: &str,
    options: &CoerceOptions,
) -> Result<Value, KeyfigError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let strict = leaf.lenient.map_or(options.strict, |lenient| !lenient);

    match &leaf.field_type {
        // Nested fields are planned as groups and never reach a leaf.
        FieldType::Raw | FieldType::Nested(_) => Ok(value.clone()),
        FieldType::Primitive(primitive) => coerce_primitive(*primitive, value, path, strict),
        FieldType::Array(element) => {
            let items = split_array(value, &leaf.array_separator, path)?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                let coerced = match element {
                    ArrayElement::Primitive(primitive) => {
                        coerce_primitive(*primitive, item, &item_path, strict)?
                    }
                    ArrayElement::Class(class) => {
                        let object = element_object(item, &item_path)?;
                        let coerced = match leaf.element.as_deref() {
                            Some(rules) => coerce_node(rules, &object, &item_path, options)?,
                            None => object,
                        };
                        if options.expose_defaults {
                            with_defaults(class.defaults(), coerced, class.name())?
                        } else {
                            coerced
                        }
                    }
                };
                out.push(coerced);
            }
            Ok(Value::Array(out))
        }
    }
}

/// Coerce one scalar. `strict` controls what happens to unparseable strings.
pub fn coerce_primitive(
    primitive: Primitive,
    value: &Value,
    path: &str,
    strict: bool,
) -> Result<Value, KeyfigError> {
    let unparsed = |reason: &str| {
        if strict {
            Err(KeyfigError::coercion(path, value, reason))
        } else {
            Ok(value.clone())
        }
    };

    match (primitive, value) {
        (_, Value::Null) => Ok(Value::Null),
        (Primitive::String, _) => Ok(value.clone()),

        (Primitive::Number, Value::Number(_)) => Ok(value.clone()),
        (Primitive::Number, Value::String(s)) => match parse_number(s.trim()) {
            Some(n) => Ok(Value::Number(n)),
            None => unparsed("not a number"),
        },
        (Primitive::Number, _) => Err(KeyfigError::coercion(path, value, "expected a number")),

        (Primitive::Integer { .. }, Value::Number(_)) => Ok(value.clone()),
        (Primitive::Integer { radix }, Value::String(s)) => {
            match i64::from_str_radix(s.trim(), radix) {
                Ok(n) => Ok(Value::from(n)),
                Err(_) => unparsed(&format!("not a base-{radix} integer")),
            }
        }
        (Primitive::Integer { .. }, _) => {
            Err(KeyfigError::coercion(path, value, "expected an integer"))
        }

        (Primitive::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (Primitive::Boolean, Value::String(s)) if s == "true" => Ok(Value::Bool(true)),
        (Primitive::Boolean, Value::String(s)) if s == "false" => Ok(Value::Bool(false)),
        (Primitive::Boolean, _) => unparsed("not a boolean, expected \"true\" or \"false\""),
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Number::from(u));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Sequence input is kept; a string is split on `separator`, and the empty
/// string is the empty array.
fn split_array(value: &Value, separator: &str, path: &str) -> Result<Vec<Value>, KeyfigError> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(s
            .split(separator)
            .map(|part| Value::String(part.to_string()))
            .collect()),
        other => Err(KeyfigError::coercion(
            path,
            other,
            "expected a sequence or a delimited string",
        )),
    }
}

/// An array element for an array of config objects: objects are used as is,
/// strings are read as `key=value;key=value`.
fn element_object(item: &Value, path: &str) -> Result<Value, KeyfigError> {
    match item {
        Value::Object(_) => Ok(item.clone()),
        Value::String(s) => Ok(Value::Object(parse_pairs(s))),
        other => Err(KeyfigError::coercion(
            path,
            other,
            "expected an object or \"key=value;...\" pairs",
        )),
    }
}

/// Split `url=https://x;token=t` into `{url: "https://x", token: "t"}`.
///
/// Each entry is split at its first `=`, so values may contain `=`. Empty
/// entries are skipped; an entry without `=` maps to the empty string.
pub fn parse_pairs(s: &str) -> Map<String, Value> {
    s.split(';')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
            (key.to_string(), Value::String(value.to_string()))
        })
        .collect()
}

fn with_defaults(
    defaults: Result<Value, serde_json::Error>,
    element: Value,
    class: &str,
) -> Result<Value, KeyfigError> {
    let defaults = defaults.map_err(|e| KeyfigError::Instantiate {
        class: class.to_string(),
        reason: format!("default instance does not serialize: {e}"),
    })?;
    match (defaults, element) {
        (Value::Object(base), Value::Object(overlay)) => {
            Ok(Value::Object(overlay_values(base, overlay)))
        }
        (_, element) => Ok(element),
    }
}

pub(crate) fn field_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ClassId;
    use crate::fixtures::test::{RuleConfig, TestConfig};
    use crate::registry::Registry;
    use crate::schema::plan;
    use serde_json::json;

    fn schema_of<C: crate::Configurable>() -> SchemaNode {
        let registry = Registry::for_class::<C>().unwrap();
        plan(&registry, ClassId::of::<C>(), None).unwrap()
    }

    fn strict() -> CoerceOptions {
        CoerceOptions::default()
    }

    fn lenient() -> CoerceOptions {
        CoerceOptions {
            strict: false,
            ..CoerceOptions::default()
        }
    }

    #[test]
    fn numbers_from_strings() {
        let n = |s: &str| coerce_primitive(Primitive::Number, &json!(s), "x", true).unwrap();
        assert_eq!(n("8989"), json!(8989));
        assert_eq!(n(" 42 "), json!(42));
        assert_eq!(n("-7"), json!(-7));
        assert_eq!(n("1.5"), json!(1.5));
        assert_eq!(n("18446744073709551615"), json!(18446744073709551615u64));
    }

    #[test]
    fn numbers_pass_through() {
        let v = coerce_primitive(Primitive::Number, &json!(5000), "x", true).unwrap();
        assert_eq!(v, json!(5000));
    }

    #[test]
    fn unparseable_number_strict_vs_lenient() {
        let err = coerce_primitive(Primitive::Number, &json!("abc"), "app_port", true).unwrap_err();
        assert!(matches!(err, KeyfigError::Coercion { ref path, .. } if path == "app_port"));

        let v = coerce_primitive(Primitive::Number, &json!("abc"), "app_port", false).unwrap();
        assert_eq!(v, json!("abc"));
    }

    #[test]
    fn wrong_shape_is_always_an_error() {
        for strict in [true, false] {
            assert!(coerce_primitive(Primitive::Number, &json!(true), "x", strict).is_err());
            assert!(coerce_primitive(Primitive::Number, &json!([1]), "x", strict).is_err());
            assert!(coerce_primitive(Primitive::Integer { radix: 10 }, &json!({}), "x", strict).is_err());
        }
    }

    #[test]
    fn integers_use_radix() {
        let hex = Primitive::Integer { radix: 16 };
        assert_eq!(coerce_primitive(hex, &json!("ff"), "x", true).unwrap(), json!(255));
        let bin = Primitive::Integer { radix: 2 };
        assert_eq!(coerce_primitive(bin, &json!("101"), "x", true).unwrap(), json!(5));
        let dec = Primitive::Integer { radix: 10 };
        assert!(coerce_primitive(dec, &json!("1.5"), "x", true).is_err());
    }

    #[test]
    fn booleans_accept_exact_literals() {
        let b = Primitive::Boolean;
        assert_eq!(coerce_primitive(b, &json!("true"), "x", true).unwrap(), json!(true));
        assert_eq!(coerce_primitive(b, &json!("false"), "x", true).unwrap(), json!(false));
        assert_eq!(coerce_primitive(b, &json!(true), "x", true).unwrap(), json!(true));

        let err = coerce_primitive(b, &json!("notabool"), "db.auto_reconnect", true).unwrap_err();
        assert!(err.to_string().contains("notabool"));
        assert!(coerce_primitive(b, &json!("TRUE"), "x", true).is_err());
        assert_eq!(
            coerce_primitive(b, &json!("yes"), "x", false).unwrap(),
            json!("yes")
        );
    }

    #[test]
    fn strings_pass_through() {
        let v = coerce_primitive(Primitive::String, &json!(12), "x", true).unwrap();
        assert_eq!(v, json!(12));
    }

    #[test]
    fn null_is_never_coerced() {
        let schema = schema_of::<TestConfig>();
        let out = coerce_tree(&schema, &json!({"app_port": null}), &strict()).unwrap();
        assert_eq!(out["app_port"], Value::Null);
    }

    #[test]
    fn arrays_split_on_field_separator() {
        let schema = schema_of::<TestConfig>();
        let out = coerce_tree(&schema, &json!({"tasks": "a:b:c"}), &strict()).unwrap();
        assert_eq!(out["tasks"], json!(["a", "b", "c"]));

        let out = coerce_tree(&schema, &json!({"tasks": ""}), &strict()).unwrap();
        assert_eq!(out["tasks"], json!([]));

        let out = coerce_tree(&schema, &json!({"tasks": ["x", "y"]}), &strict()).unwrap();
        assert_eq!(out["tasks"], json!(["x", "y"]));
    }

    #[test]
    fn number_arrays_coerce_each_element() {
        let schema = schema_of::<RuleConfig>();
        let out = coerce_tree(&schema, &json!({"ratios": "0.5|2|-1"}), &strict()).unwrap();
        assert_eq!(out["ratios"], json!([0.5, 2, -1]));

        let err = coerce_tree(&schema, &json!({"ratios": "1|x"}), &strict()).unwrap_err();
        assert!(matches!(err, KeyfigError::Coercion { ref path, .. } if path == "ratios[1]"));
    }

    #[test]
    fn array_input_of_wrong_shape_is_an_error() {
        let schema = schema_of::<TestConfig>();
        let err = coerce_tree(&schema, &json!({"tasks": 5}), &lenient()).unwrap_err();
        assert!(matches!(err, KeyfigError::Coercion { .. }));
    }

    #[test]
    fn array_of_objects_from_pair_strings() {
        let schema = schema_of::<TestConfig>();
        let raw = json!({"repositories": "url=https://x;token=t;someFlag=true"});
        let out = coerce_tree(&schema, &raw, &strict()).unwrap();
        assert_eq!(
            out["repositories"],
            json!([{"url": "https://x", "token": "t", "someFlag": true}])
        );
    }

    #[test]
    fn array_of_objects_fills_element_defaults() {
        let schema = schema_of::<TestConfig>();
        let raw = json!({"repositories": [{"url": "https://a"}, "url=https://b;someFlag=false"]});
        let out = coerce_tree(&schema, &raw, &strict()).unwrap();
        assert_eq!(
            out["repositories"],
            json!([
                {"url": "https://a", "token": "", "someFlag": false},
                {"url": "https://b", "token": "", "someFlag": false},
            ])
        );

        let no_defaults = CoerceOptions {
            expose_defaults: false,
            ..strict()
        };
        let out = coerce_tree(&schema, &raw, &no_defaults).unwrap();
        assert_eq!(out["repositories"][0], json!({"url": "https://a"}));
    }

    #[test]
    fn nested_values_are_coerced() {
        let schema = schema_of::<TestConfig>();
        let raw = json!({"db": {"auto_reconnect": "true", "pool_size": "12"}});
        let out = coerce_tree(&schema, &raw, &strict()).unwrap();
        assert_eq!(out["db"], json!({"auto_reconnect": true, "pool_size": 12}));

        let err = coerce_tree(&schema, &json!({"db": {"auto_reconnect": "notabool"}}), &strict())
            .unwrap_err();
        assert!(matches!(err, KeyfigError::Coercion { ref path, .. } if path == "db.auto_reconnect"));
    }

    #[test]
    fn raw_fields_are_untouched() {
        let schema = schema_of::<RuleConfig>();
        let out = coerce_tree(&schema, &json!({"tasks": "a,b"}), &strict()).unwrap();
        assert_eq!(out["tasks"], json!("a,b"));
    }

    #[test]
    fn parse_pairs_splits_on_first_equals() {
        let pairs = parse_pairs("url=https://x?a=b;;token=");
        assert_eq!(
            Value::Object(pairs),
            json!({"url": "https://x?a=b", "token": ""})
        );
    }
}
