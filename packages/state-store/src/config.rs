//! Store construction options.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Value;

/// Options a store is created (and reset) with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Initial contents of the root. Only a map is accepted; anything else
    /// starts the store empty.
    #[serde(alias = "initStore")]
    pub init_store: Option<Value>,
}

impl StoreOptions {
    /// Options with an initial root.
    pub fn with_init_store(init_store: impl Into<Value>) -> Self {
        Self {
            init_store: Some(init_store.into()),
        }
    }

    /// Parse options from JSON, e.g. `{"initStore": {"user": {...}}}`.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        serde_json::from_value(json).map_err(|e| Error::Serialization {
            message: e.to_string(),
        })
    }

    /// Fresh root built from these options.
    pub(crate) fn initial_root(&self) -> Value {
        match &self.init_store {
            Some(init) if init.is_map() => init.deep_clone(),
            _ => Value::map(),
        }
    }
}
