//! pathstate: an observable, path-addressed, in-memory state tree.
//!
//! One [`StateStore`] owns a [`Value`] graph. Any location in it can be:
//! - read synchronously ([`StateStore::get_state`])
//! - written with replace, merge, signal, or compare-skip semantics
//!   ([`StateStore::set_state`])
//! - watched ([`StateStore::select`]), with changes pushed synchronously to
//!   per-path observers and to one unfiltered command stream
//!   ([`StateStore::commands`])
//!
//! Paths are segment lists whose canonical form is the segments joined with
//! `.`; see [`StatePath`].
//!
//! # Example
//!
//! ```rust
//! use pathstate::{path, StateAction, StateStore, StoreOptions, Value};
//! use serde_json::json;
//!
//! let store = StateStore::with_options(StoreOptions::with_init_store(Value::from(json!({
//!     "user": {"id": 51, "fName": "Ivan", "lName": "Ivanov"}
//! }))));
//!
//! store.set_state(StateAction::new(path!["user", "fName"], "Dima")).unwrap();
//! assert_eq!(store.get_state(&path!["user", "fName"]), Some(Value::from("Dima")));
//! assert_eq!(store.get_state(&path!["user", "id"]), Some(Value::from(51i64)));
//! ```

pub mod accessor;
mod action;
pub mod bus;
mod config;
mod error;
mod path;
mod store;
mod value;

pub use action::{ActionOptions, StateAction, StateChange, StoreCommand};
pub use bus::{Observer, Subscription};
pub use config::StoreOptions;
pub use error::{Error, Result};
pub use path::StatePath;
pub use store::StateStore;
pub use value::Value;
