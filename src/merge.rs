use serde_json::{Map, Value};

/// Deep-merge `overlay` on top of `base`.
/// If both sides have an object for the same key, recurse.
/// Otherwise, `overlay`'s value wins (arrays are replaced, not concatenated).
pub fn deep_merge(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, overlay_val) in overlay {
        match (base.remove(&key), overlay_val) {
            (Some(Value::Object(base_obj)), Value::Object(overlay_obj)) => {
                base.insert(key, Value::Object(deep_merge(base_obj, overlay_obj)));
            }
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}

/// Like [`deep_merge`], but a `null` in the overlay keeps the base value.
pub fn overlay_values(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, overlay_val) in overlay {
        match (base.remove(&key), overlay_val) {
            (Some(Value::Object(base_obj)), Value::Object(overlay_obj)) => {
                base.insert(key, Value::Object(overlay_values(base_obj, overlay_obj)));
            }
            (Some(base_val), Value::Null) => {
                base.insert(key, base_val);
            }
            (None, Value::Null) => {}
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}

/// Navigate a value tree by dotted key path (e.g. `"db.mysql.host"`).
///
/// Numeric segments index into arrays. Returns `None` when any segment is
/// missing; an explicit `null` at the end of the path is returned as `Some(Null)`.
pub fn get_path<'a>(tree: &'a Value, dotted_key: &str) -> Option<&'a Value> {
    dotted_key.split('.').try_fold(tree, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Set `value` at a dotted key path, creating intermediate objects.
///
/// An intermediate scalar is replaced by an object, so later entries win when
/// keys conflict (`a=1` then `a.b=2` yields `{a: {b: 2}}`).
pub fn set_path(tree: &mut Map<String, Value>, dotted_key: &str, value: Value) {
    let mut segments = dotted_key.split('.').peekable();
    let mut current = tree;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
}

/// Remove the value at a dotted key path. Returns the removed value, or
/// `None` when any segment is missing.
pub fn remove_path(tree: &mut Map<String, Value>, dotted_key: &str) -> Option<Value> {
    match dotted_key.split_once('.') {
        None => tree.remove(dotted_key),
        Some((head, rest)) => match tree.get_mut(head) {
            Some(Value::Object(next)) => remove_path(next, rest),
            _ => None,
        },
    }
}
