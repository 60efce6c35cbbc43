//! The Value type - the tree held by a state store.
//!
//! Every node of the store graph is a `Value`. Containers (`Map` and
//! `Array`) can be navigated by path; everything else is a leaf.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// A tree-shaped value stored at a path.
///
/// # Design Notes
///
/// - Uses `BTreeMap` for deterministic key ordering (stable fan-out order)
/// - `Null` is a value, not a container. Absence of a value is `Option::None`
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Explicit null.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key-value map with string keys.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Check if this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Check if this value can be navigated into (`Map` or `Array`).
    ///
    /// `Null` is never a container.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Array(_))
    }

    /// Look up a direct child by a single path segment.
    ///
    /// Arrays are indexed by decimal segments. Leaves have no children.
    pub fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(segment),
            Value::Array(arr) => {
                let index: usize = segment.parse().ok()?;
                arr.get(index)
            }
            _ => None,
        }
    }

    /// Trivial equality used by compare-skip writes.
    ///
    /// Scalars compare by value (integers and floats numerically). Containers
    /// are never trivially equal: a freshly supplied map or array is always a
    /// distinct state, even if its contents happen to match.
    pub fn trivially_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Shallow-merge `incoming` over `self`.
    ///
    /// Returns `None` unless both values are containers of the same kind.
    /// Maps take the union of keys with incoming keys winning. Arrays are
    /// overlaid index by index, keeping any trailing old elements.
    pub fn shallow_merge(&self, incoming: &Value) -> Option<Value> {
        match (self, incoming) {
            (Value::Map(old), Value::Map(new)) => {
                let mut merged = old.clone();
                for (key, value) in new {
                    merged.insert(key.clone(), value.clone());
                }
                Some(Value::Map(merged))
            }
            (Value::Array(old), Value::Array(new)) => {
                let mut merged = new.clone();
                if old.len() > new.len() {
                    merged.extend(old[new.len()..].iter().cloned());
                }
                Some(Value::Array(merged))
            }
            _ => None,
        }
    }

    /// Top-level keys of a container, in iteration order.
    ///
    /// Array keys are the decimal indices. Leaves have no keys.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Map(map) => map.keys().cloned().collect(),
            Value::Array(arr) => (0..arr.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Convert any serializable type into a `Value`.
    ///
    /// Goes through a JSON round trip, so non-finite floats become `Null`.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Value, Error> {
        let json = serde_json::to_value(data).map_err(|e| Error::Serialization {
            message: e.to_string(),
        })?;
        Ok(Value::from(json))
    }

    /// Deserialize this value into a Rust type.
    pub fn deserialize_into<T: DeserializeOwned>(self) -> Result<T, Error> {
        serde_json::from_value(serde_json::Value::from(self)).map_err(|e| Error::Serialization {
            message: e.to_string(),
        })
    }

    /// Deep clone through a serialize/deserialize round trip.
    ///
    /// Used when installing initial state so the store never shares structure
    /// with its caller. Non-finite floats are dropped to `Null`.
    pub fn deep_clone(&self) -> Value {
        Value::from(serde_json::Value::from(self.clone()))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    // Fallback for numbers that fit neither i64 nor f64
                    Value::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;
    use serde_json::json;

    fn user() -> Value {
        Value::from(json!({"fName": "Ivan", "lName": "Ivanov"}))
    }

    #[test]
    fn null_is_not_a_container() {
        assert!(!Value::Null.is_container());
        assert!(Value::map().is_container());
        assert!(Value::array().is_container());
        assert!(!Value::from("x").is_container());
    }

    #[test]
    fn child_lookup() {
        let v = Value::from(json!({"items": ["a", "b"]}));
        let items = v.child("items").unwrap();
        assert_eq!(items.child("1"), Some(&Value::from("b")));
        assert_eq!(items.child("2"), None);
        assert_eq!(items.child("x"), None);
        assert_eq!(Value::from(3i64).child("0"), None);
    }

    #[test]
    fn trivial_equality_on_scalars() {
        assert!(Value::from(1i64).trivially_eq(&Value::from(1i64)));
        assert!(Value::from(1i64).trivially_eq(&Value::from(1.0)));
        assert!(Value::from("a").trivially_eq(&Value::from("a")));
        assert!(Value::Null.trivially_eq(&Value::Null));
        assert!(!Value::from(f64::NAN).trivially_eq(&Value::from(f64::NAN)));
        assert!(!Value::from("1").trivially_eq(&Value::from(1i64)));
    }

    #[test]
    fn containers_are_never_trivially_equal() {
        assert!(!user().trivially_eq(&user()));
        assert!(!Value::array().trivially_eq(&Value::array()));
    }

    #[test]
    fn merge_maps_keeps_untouched_keys() {
        let incoming = Value::from(json!({"lName": "Petrov", "mName": "Vova"}));
        let merged = user().shallow_merge(&incoming).unwrap();
        assert_eq!(
            merged,
            Value::from(json!({"fName": "Ivan", "lName": "Petrov", "mName": "Vova"}))
        );
    }

    #[test]
    fn merge_is_shallow() {
        let old = Value::from(json!({"a": {"x": 1, "y": 2}}));
        let merged = old
            .shallow_merge(&Value::from(json!({"a": {"x": 5}})))
            .unwrap();
        assert_eq!(merged, Value::from(json!({"a": {"x": 5}})));
    }

    #[test]
    fn merge_arrays_overlays_indices() {
        let old = Value::from(json!([1, 2, 3]));
        let merged = old.shallow_merge(&Value::from(json!([9]))).unwrap();
        assert_eq!(merged, Value::from(json!([9, 2, 3])));
    }

    #[test]
    fn merge_requires_matching_containers() {
        assert!(user().shallow_merge(&Value::from(json!([1]))).is_none());
        assert!(Value::from(1i64).shallow_merge(&user()).is_none());
        assert!(user().shallow_merge(&Value::Null).is_none());
    }

    #[test]
    fn keys_of_containers() {
        assert_eq!(user().keys(), vec!["fName".to_string(), "lName".to_string()]);
        assert_eq!(
            Value::from(json!(["a", "b"])).keys(),
            vec!["0".to_string(), "1".to_string()]
        );
        assert!(Value::from(true).keys().is_empty());
    }

    #[test]
    fn deep_clone_drops_non_finite_floats() {
        let v = Value::Map(btree! {
            "ok".to_string() => Value::Float(1.5),
            "bad".to_string() => Value::Float(f64::INFINITY),
        });
        let cloned = v.deep_clone();
        assert_eq!(cloned.child("ok"), Some(&Value::Float(1.5)));
        assert_eq!(cloned.child("bad"), Some(&Value::Null));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Podium {
        title: String,
        seats: u32,
    }

    #[test]
    fn serde_roundtrip() {
        let podium = Podium {
            title: "main".to_string(),
            seats: 12,
        };
        let value = Value::from_serialize(&podium).unwrap();
        assert_eq!(value.child("seats"), Some(&Value::Integer(12)));
        let back: Podium = value.deserialize_into().unwrap();
        assert_eq!(back, podium);
    }

    #[test]
    fn deserialize_into_wrong_shape_fails() {
        let result: Result<Podium, _> = Value::from("nope").deserialize_into();
        assert!(matches!(result, Err(Error::Serialization { .. })));
    }
}
