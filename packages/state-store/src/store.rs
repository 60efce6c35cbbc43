//! The state store: a path-addressed, observable tree.
//!
//! Reads are synchronous snapshots of the graph. Writes go through
//! [`StateStore::set_state`], which mutates the graph and then notifies, in
//! this order, before returning:
//!
//! 1. subscribers of each merged child key (merge writes only), in key order
//! 2. subscribers of the written path
//! 3. the global command stream

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::accessor;
use crate::action::{StateAction, StateChange, StoreCommand};
use crate::bus::{ChangeBus, Observer, Subscription};
use crate::config::StoreOptions;
use crate::error::{Error, Result};
use crate::{StatePath, Value};

/// An observable in-memory state tree.
///
/// `StateStore` is a cheap handle: clones share the same graph and
/// subscriptions, so an observer can capture a clone and write back into the
/// store from inside its callback. Nested writes complete before the outer
/// `set_state` returns.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use pathstate::{path, StateAction, StateStore, Value};
///
/// let store = StateStore::create();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let sink = Rc::clone(&seen);
/// let _sub = store.select(&path!["user", "fName"], false, move |v: &Option<Value>| {
///     sink.borrow_mut().push(v.clone());
/// });
///
/// store.set_state(StateAction::new(path!["user", "fName"], "Ivan")).unwrap();
///
/// assert_eq!(*seen.borrow(), vec![None, Some(Value::from("Ivan"))]);
/// assert_eq!(store.get_state(&path!["user", "fName"]), Some(Value::from("Ivan")));
/// ```
#[derive(Clone)]
pub struct StateStore {
    inner: Rc<StoreInner>,
}

struct StoreInner {
    root: RefCell<Value>,
    bus: ChangeBus,
    options: StoreOptions,
}

impl StateStore {
    /// Create an empty store.
    pub fn create() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Create a store whose root is a deep clone of `options.init_store`.
    pub fn with_options(options: StoreOptions) -> Self {
        let root = options.initial_root();
        Self {
            inner: Rc::new(StoreInner {
                root: RefCell::new(root),
                bus: ChangeBus::new(),
                options,
            }),
        }
    }

    // ==================== reads ====================

    /// Snapshot of the value at `path`. The root path returns the whole store.
    pub fn get_state(&self, path: &StatePath) -> Option<Value> {
        self.get_state_by_path(path.as_str())
    }

    /// Snapshot by canonical path string. `""` returns the whole store.
    pub fn get_state_by_path(&self, path: &str) -> Option<Value> {
        let root = self.inner.root.borrow();
        if path.is_empty() {
            return Some(root.clone());
        }
        accessor::get(&root, path).cloned()
    }

    /// Snapshot of the value at `path`, falling back to `default`.
    pub fn get_state_or(&self, path: &StatePath, default: Value) -> Value {
        self.get_state(path).unwrap_or(default)
    }

    /// Snapshot of the value at `path`, deserialized into `T`.
    pub fn get_state_as<T: DeserializeOwned>(&self, path: &StatePath) -> Result<Option<T>> {
        self.get_state(path)
            .map(Value::deserialize_into)
            .transpose()
    }

    /// Snapshot of the whole store.
    pub fn root(&self) -> Value {
        self.inner.root.borrow().clone()
    }

    // ==================== subscriptions ====================

    /// Observe the value at `path`.
    ///
    /// Unless `only_changes` is set, the observer first receives the current
    /// value (possibly `None`) before this call returns. After that it gets
    /// the new value of every write that targets `path` exactly, including
    /// signal writes and merge fan-out. Delivery ends on
    /// [`Subscription::unsubscribe`] or [`StateStore::destroy`].
    pub fn select(
        &self,
        path: &StatePath,
        only_changes: bool,
        observer: impl Observer<Option<Value>> + 'static,
    ) -> Subscription {
        let channel = self.inner.bus.ensure_channel(path.as_str());
        if !only_changes {
            observer.next(&self.get_state(path));
        }
        channel.subscribe(NewValues(observer))
    }

    /// Observe full old/new changes at `path`, without an initial snapshot.
    pub fn watch(
        &self,
        path: &StatePath,
        observer: impl Observer<StateChange> + 'static,
    ) -> Subscription {
        self.inner
            .bus
            .ensure_channel(path.as_str())
            .subscribe(observer)
    }

    /// Observe every applied write, unfiltered.
    pub fn commands(&self, observer: impl Observer<StoreCommand> + 'static) -> Subscription {
        self.inner.bus.subscribe_commands(observer)
    }

    /// Check whether anything ever subscribed to `path` since the last teardown.
    pub fn has_channel(&self, path: &StatePath) -> bool {
        self.inner.bus.has_channel(path.as_str())
    }

    // ==================== writes ====================

    /// Apply one write.
    ///
    /// - `compare`: if the old value is trivially equal to the new one, nothing
    ///   happens at all.
    /// - `merge`: if old and new are containers of the same kind the stored
    ///   value is their shallow merge, and each incoming top-level key is
    ///   notified on its own child path before the written path.
    /// - `signal`: the graph is left untouched but notifications still go out.
    ///
    /// Writes to the root path never modify the graph.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the path steps into an array with a non-numeric
    /// segment. Nothing is written or notified in that case.
    pub fn set_state(&self, action: StateAction) -> Result<()> {
        let StateAction {
            path,
            value,
            options,
        } = action;
        let key = path.as_str();

        let old_value = self.read(key);

        if options.compare
            && old_value
                .as_ref()
                .is_some_and(|old| old.trivially_eq(&value))
        {
            debug!(path = key, "state unchanged, skipping write");
            return Ok(());
        }

        let merged = if options.merge {
            old_value.as_ref().and_then(|old| old.shallow_merge(&value))
        } else {
            None
        };
        let fan_out = if merged.is_some() {
            value.keys()
        } else {
            Vec::new()
        };
        let new_value = merged.unwrap_or(value);

        if options.signal {
            debug!(path = key, "signalling state without persisting");
        } else if !key.is_empty() {
            let written = accessor::set(&mut self.inner.root.borrow_mut(), key, new_value.clone());
            if !written {
                return Err(unaddressable("set_state", key));
            }
            debug!(path = key, merge = !fan_out.is_empty(), "state written");
        }

        for child_key in &fan_out {
            let child_path = path.child(child_key);
            if !self.inner.bus.has_channel(child_path.as_str()) {
                continue;
            }
            let change = StateChange {
                old_value: old_value
                    .as_ref()
                    .and_then(|old| old.child(child_key))
                    .cloned(),
                new_value: new_value.child(child_key).cloned().unwrap_or_default(),
            };
            self.inner.bus.publish(child_path.as_str(), &change);
        }

        if self.inner.bus.has_channel(key) {
            let change = StateChange {
                old_value: old_value.clone(),
                new_value: new_value.clone(),
            };
            self.inner.bus.publish(key, &change);
        }

        self.inner.bus.publish_command(&StoreCommand {
            path: key.to_string(),
            segments: path.segments().to_vec(),
            old_value,
            new_value,
            options,
        });

        Ok(())
    }

    /// Apply writes in order. Stops at the first failure; earlier writes stay.
    pub fn set_states(&self, actions: impl IntoIterator<Item = StateAction>) -> Result<()> {
        for action in actions {
            self.set_state(action)?;
        }
        Ok(())
    }

    /// Apply one write given in JSON form (see [`StateAction::from_json`]).
    pub fn set_state_json(&self, action: &serde_json::Value) -> Result<()> {
        self.set_state(StateAction::from_json(action)?)
    }

    /// Apply a JSON array of writes in order, failing fast.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `actions` is not an array, or at the first
    /// malformed action. Actions before it remain applied.
    pub fn set_states_json(&self, actions: &serde_json::Value) -> Result<()> {
        let actions = actions.as_array().ok_or_else(|| {
            Error::invalid_argument("set_states", "the input argument must be an array")
        })?;
        for action in actions {
            self.set_state_json(action)?;
        }
        Ok(())
    }

    /// Install a deep clone of `initial` at `name` (a dot-joined path).
    ///
    /// No notifications are sent.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if `name` already holds a value, `InvalidArgument` if
    /// `name` is empty or steps into an array with a non-numeric segment,
    /// `Serialization` if `initial` cannot be represented.
    pub fn add_sub_store<T: Serialize + ?Sized>(&self, name: &str, initial: &T) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_argument(
                "add_sub_store",
                "sub-store name must not be empty",
            ));
        }
        if self.read(name).is_some() {
            return Err(Error::AlreadyExists {
                path: name.to_string(),
            });
        }

        let cloned = Value::from_serialize(initial)?;
        if !accessor::set(&mut self.inner.root.borrow_mut(), name, cloned) {
            return Err(unaddressable("add_sub_store", name));
        }
        debug!(name, "sub-store added");
        Ok(())
    }

    // ==================== lifecycle ====================

    /// Complete every subscription, drop all path channels, and empty the
    /// store. Idempotent.
    pub fn destroy(&self) {
        self.inner.bus.close_all();
        *self.inner.root.borrow_mut() = Value::map();
        debug!("state store destroyed");
    }

    /// Destroy, then re-initialise from the options the store was created with.
    pub fn reset(&self) {
        self.destroy();
        *self.inner.root.borrow_mut() = self.inner.options.initial_root();
        debug!("state store reset");
    }

    fn read(&self, path: &str) -> Option<Value> {
        accessor::get(&self.inner.root.borrow(), path).cloned()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::create()
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("root", &*self.inner.root.borrow())
            .field("channels", &self.inner.bus.channel_count())
            .finish()
    }
}

fn unaddressable(operation: &'static str, path: &str) -> Error {
    Error::invalid_argument(
        operation,
        format!("path `{}` indexes an array with a non-numeric segment", path),
    )
}

/// Adapts a value observer to a change channel.
struct NewValues<O>(O);

impl<O: Observer<Option<Value>>> Observer<StateChange> for NewValues<O> {
    fn next(&self, change: &StateChange) {
        self.0.next(&Some(change.new_value.clone()));
    }

    fn complete(&self) {
        self.0.complete();
    }
}
