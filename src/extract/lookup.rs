//! Tolerant access into JSON values of unknown shape.
//!
//! Two layers: [`at`] walks a known dotted path and [`deep_find_first`] /
//! [`deep_fill_strings`] search the whole tree breadth-first. The breadth-first
//! helpers visit object entries in insertion order and array items in index
//! order, so the first match is deterministic for a given document.

use serde_json::Value;
use std::collections::VecDeque;

/// Follow a dotted path such as `variants.0.price.selling_price`
///
/// Numeric segments index into arrays; anything that does not fit the
/// current node yields `None`.
pub fn at<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = node;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Value at `path` unless it is absent or JSON null
pub fn present<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    at(node, path).filter(|v| !v.is_null())
}

/// Numeric reading of a value; numeric strings are accepted
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Number at `path`
pub fn number_at(node: &Value, path: &str) -> Option<f64> {
    present(node, path).and_then(as_number)
}

/// Trimmed string, if the value is a string with visible content
pub fn non_blank(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Text rendering of a scalar that is neither empty nor zero
pub fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifier of a product node as a dedup key
pub fn product_id(node: &Value) -> Option<String> {
    match node.get("id")? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First value of a string, number or object type stored under one of `keys`
///
/// The root node counts as depth zero; all keys of a node are checked before
/// any of its children are visited.
pub fn deep_find_first<'a>(node: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let mut queue: VecDeque<&Value> = VecDeque::from([node]);

    while let Some(current) = queue.pop_front() {
        match current {
            Value::Object(map) => {
                for (key, value) in map {
                    if keys.contains(&key.as_str()) && is_scalar_or_object(value) {
                        return Some(value);
                    }
                    if is_container(value) {
                        queue.push_back(value);
                    }
                }
            }
            Value::Array(items) => {
                queue.extend(items.iter().filter(|v| is_container(v)));
            }
            _ => {}
        }
    }

    None
}

/// Fill every empty slot of `slots` with the first string stored under the
/// matching name in `names`, using one breadth-first pass for all of them
pub fn deep_fill_strings(node: &Value, names: &[&str], slots: &mut [String]) {
    debug_assert_eq!(names.len(), slots.len());
    let mut queue: VecDeque<&Value> = VecDeque::from([node]);

    while let Some(current) = queue.pop_front() {
        if slots.iter().all(|s| !s.is_empty()) {
            return;
        }
        match current {
            Value::Object(map) => {
                for (key, value) in map {
                    if let (Some(idx), Some(text)) =
                        (names.iter().position(|n| n == key), value.as_str())
                    {
                        if slots[idx].is_empty() {
                            slots[idx] = text.to_string();
                        }
                    }
                    if is_container(value) {
                        queue.push_back(value);
                    }
                }
            }
            Value::Array(items) => {
                queue.extend(items.iter().filter(|v| is_container(v)));
            }
            _ => {}
        }
    }
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn is_scalar_or_object(value: &Value) -> bool {
    value.is_string() || value.is_number() || value.is_object()
}
