//! Navigation of a `Value` graph by canonical (dot-joined) path.
//!
//! Both directions are total: a path that cannot be resolved reads as
//! `None`, and a write that cannot be placed is a no-op.

use tracing::trace;

use crate::path::SEPARATOR;
use crate::Value;

/// Get a reference to the value at `path`.
///
/// Returns `None` if `root` is not a container, `path` is empty, an
/// intermediate segment is missing or not a container, or the final segment
/// is absent.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if !root.is_container() || path.is_empty() {
        return None;
    }

    let mut cursor = root;
    for segment in path.split(SEPARATOR) {
        cursor = cursor.child(segment)?;
    }
    Some(cursor)
}

/// Like [`get`], falling back to `default` when nothing resolves.
pub fn get_or<'a>(root: &'a Value, path: &str, default: &'a Value) -> &'a Value {
    get(root, path).unwrap_or(default)
}

/// Set `value` at `path`, creating intermediate maps as needed.
///
/// Any intermediate that is missing or not a container is replaced with an
/// empty map; whatever was there is lost. A numeric index past the end of an
/// array pads the array with `Null` up to that index. Returns `false` without
/// touching the graph if `root` is not a container, `path` is empty, or a
/// segment under an array is not a decimal index.
pub fn set(root: &mut Value, path: &str, value: Value) -> bool {
    if !root.is_container() || path.is_empty() {
        trace!(path, "refusing write: root is not a container or path is empty");
        return false;
    }

    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut cursor = root;
    for segment in parents {
        cursor = match descend_or_create(cursor, segment) {
            Some(next) => next,
            None => {
                trace!(path, segment, "refusing write: non-numeric array index");
                return false;
            }
        };
    }

    assign(cursor, last, value)
}

/// Step into `segment`, making sure the result is a container.
fn descend_or_create<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    let next = match node {
        Value::Map(map) => map.entry(segment.to_string()).or_insert_with(Value::map),
        Value::Array(arr) => {
            let index: usize = segment.parse().ok()?;
            slot(arr, index)
        }
        _ => return None,
    };

    if !next.is_container() {
        *next = Value::map();
    }
    Some(next)
}

/// Place `value` under `key` of a container.
fn assign(parent: &mut Value, key: &str, value: Value) -> bool {
    match parent {
        Value::Map(map) => {
            map.insert(key.to_string(), value);
            true
        }
        Value::Array(arr) => {
            let Ok(index) = key.parse::<usize>() else {
                trace!(key, "refusing write: non-numeric array index");
                return false;
            };
            *slot(arr, index) = value;
            true
        }
        _ => false,
    }
}

/// Mutable slot `index` of `arr`, padding with `Null` if it lies past the end.
fn slot(arr: &mut Vec<Value>, index: usize) -> &mut Value {
    if index >= arr.len() {
        arr.resize(index + 1, Value::Null);
    }
    &mut arr[index]
}
