//! Write requests and the events they produce.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{StatePath, Value};

/// Flags that change how a [`StateAction`] is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionOptions {
    /// Notify subscribers without persisting the value.
    pub signal: bool,
    /// Skip the write entirely when the old value is trivially equal to the new one.
    pub compare: bool,
    /// Shallow-merge a container value into the existing container.
    pub merge: bool,
}

/// A request to write `value` at `path`.
#[derive(Clone, Debug, PartialEq)]
pub struct StateAction {
    pub path: StatePath,
    pub value: Value,
    pub options: ActionOptions,
}

impl StateAction {
    /// A plain replace write.
    pub fn new(path: impl Into<StatePath>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            options: ActionOptions::default(),
        }
    }

    /// Replace all options.
    #[must_use]
    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    /// Mark as a signal write.
    #[must_use]
    pub fn signal(mut self) -> Self {
        self.options.signal = true;
        self
    }

    /// Mark as a compare-skip write.
    #[must_use]
    pub fn compare(mut self) -> Self {
        self.options.compare = true;
        self
    }

    /// Mark as a merge write.
    #[must_use]
    pub fn merge(mut self) -> Self {
        self.options.merge = true;
        self
    }

    /// Build an action from its JSON form:
    /// `{"path": [...], "value": ..., "options": {...}}`.
    ///
    /// Path segments that are not strings are coerced through their JSON
    /// text (`4` becomes `"4"`). A missing `value` is `null`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `json` is not an object, `path` is not an array,
    /// or `options` is malformed.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::invalid_argument("set_state", "state action must be an object"))?;

        let segments = object
            .get("path")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| Error::invalid_argument("set_state", "path must be an array"))?;

        let path = StatePath::new(segments.iter().map(|segment| match segment {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }));

        let value = object.get("value").cloned().map(Value::from).unwrap_or_default();

        let options = match object.get("options") {
            None | Some(serde_json::Value::Null) => ActionOptions::default(),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
                Error::invalid_argument("set_state", format!("malformed options: {}", e))
            })?,
        };

        Ok(Self {
            path,
            value,
            options,
        })
    }
}

/// Event delivered to subscribers of a single path.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateChange {
    /// Value before the write; `None` if nothing was there.
    pub old_value: Option<Value>,
    pub new_value: Value,
}

/// Event delivered on the global stream, once per applied write.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoreCommand {
    /// Canonical path string.
    pub path: String,
    /// Segments as supplied by the writer.
    pub segments: Vec<String>,
    pub old_value: Option<Value>,
    pub new_value: Value,
    pub options: ActionOptions,
}
