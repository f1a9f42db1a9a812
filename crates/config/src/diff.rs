//! Change-key audit between two configuration snapshots.
//!
//! Produces the dotted paths whose values differ between a `before` and an
//! `after` tree, in the declaration order of the `before` snapshot. The
//! pipeline logs these paths after every resolution so operators can see
//! exactly which knobs a file or the environment touched.

use serde_json::{Map, Value};

/// Collect the dotted paths of leaf values that differ between `before`
/// and `after`.
///
/// Only keys declared in `before` are inspected; keys that exist solely in
/// `after` are ignored, as are keys `after` dropped. Nested objects are
/// walked depth-first with `.`-joined paths. Arrays and kind mismatches
/// are compared wholesale and contribute at most one path.
#[must_use]
pub fn changed_keys(before: &Value, after: &Value) -> Vec<String> {
    let mut changed = Vec::new();
    if let (Value::Object(before_map), Value::Object(after_map)) = (before, after) {
        collect_object_changes(before_map, after_map, None, &mut changed);
    }
    changed
}

fn collect_object_changes(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    prefix: Option<&str>,
    changed: &mut Vec<String>,
) {
    for (key, before_value) in before {
        let Some(after_value) = after.get(key) else {
            continue;
        };
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match (before_value, after_value) {
            (Value::Object(before_child), Value::Object(after_child)) => {
                collect_object_changes(before_child, after_child, Some(&path), changed);
            },
            _ => {
                if before_value != after_value {
                    changed.push(path);
                }
            },
        }
    }
}
