//! Synchronous multicast channels and the per-path change bus.
//!
//! A [`Channel`] delivers every published item to its current observers, in
//! subscription order, before `publish` returns. Publishing iterates a
//! snapshot of the observer list, so observers may subscribe, unsubscribe, or
//! publish again from inside a callback.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::action::{StateChange, StoreCommand};

/// Receiver of items pushed through a channel.
///
/// Any `Fn(&T)` closure is an observer that ignores completion.
pub trait Observer<T> {
    /// Called once per published item.
    fn next(&self, item: &T);

    /// Called when the channel is torn down. No items follow.
    fn complete(&self) {}
}

impl<T, F> Observer<T> for F
where
    F: Fn(&T),
{
    fn next(&self, item: &T) {
        self(item)
    }
}

/// Handle to one observer's registration on a channel.
///
/// Dropping the handle does not cancel delivery; call
/// [`Subscription::unsubscribe`] for that.
#[must_use = "dropping a Subscription keeps the observer registered; call `unsubscribe` to stop delivery"]
pub struct Subscription {
    active: Rc<Cell<bool>>,
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Stop delivery to this observer. Other observers are unaffected.
    pub fn unsubscribe(&mut self) {
        self.active.set(false);
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// True once unsubscribed or once the channel was torn down.
    pub fn is_closed(&self) -> bool {
        !self.active.get()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct Listener<T> {
    id: u64,
    observer: Rc<dyn Observer<T>>,
    active: Rc<Cell<bool>>,
}

struct ChannelState<T> {
    next_id: u64,
    listeners: Vec<Listener<T>>,
}

/// A synchronous multicast endpoint.
pub struct Channel<T> {
    state: Rc<RefCell<ChannelState<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Channel<T> {
    /// Create a channel with no observers.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ChannelState {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register an observer. Delivery starts with the next publish.
    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        let active = Rc::new(Cell::new(true));
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.push(Listener {
                id,
                observer: Rc::new(observer),
                active: Rc::clone(&active),
            });
            id
        };

        let weak: Weak<RefCell<ChannelState<T>>> = Rc::downgrade(&self.state);
        Subscription {
            active,
            detach: Some(Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    state.borrow_mut().listeners.retain(|l| l.id != id);
                }
            })),
        }
    }

    /// Push `item` to every current observer, in subscription order.
    pub fn publish(&self, item: &T) {
        let snapshot: Vec<(Rc<dyn Observer<T>>, Rc<Cell<bool>>)> = self
            .state
            .borrow()
            .listeners
            .iter()
            .map(|l| (Rc::clone(&l.observer), Rc::clone(&l.active)))
            .collect();

        for (observer, active) in snapshot {
            // An earlier observer in this round may have cancelled this one.
            if active.get() {
                observer.next(item);
            }
        }
    }

    /// Complete and drop every current observer.
    ///
    /// The channel stays usable; later subscriptions are delivered normally.
    pub fn close(&self) {
        let listeners = std::mem::take(&mut self.state.borrow_mut().listeners);
        for listener in listeners {
            listener.active.set(false);
            listener.observer.complete();
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

/// Registry of per-path change channels plus the global command channel.
///
/// Path channels are created lazily by subscription and are only removed by
/// [`ChangeBus::close_all`].
pub struct ChangeBus {
    channels: RefCell<HashMap<String, Channel<StateChange>>>,
    commands: Channel<StoreCommand>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    /// Create a bus with no path channels.
    pub fn new() -> Self {
        Self {
            channels: RefCell::new(HashMap::new()),
            commands: Channel::new(),
        }
    }

    /// Return the channel for `path`, creating it if needed.
    pub fn ensure_channel(&self, path: &str) -> Channel<StateChange> {
        self.channels
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .clone()
    }

    /// Check whether a channel exists for `path`.
    pub fn has_channel(&self, path: &str) -> bool {
        self.channels.borrow().contains_key(path)
    }

    /// Number of path channels.
    pub fn channel_count(&self) -> usize {
        self.channels.borrow().len()
    }

    /// Push a change to the observers of `path`. No channel means no-op.
    pub fn publish(&self, path: &str, change: &StateChange) {
        let channel = self.channels.borrow().get(path).cloned();
        if let Some(channel) = channel {
            trace!(path, observers = channel.observer_count(), "publishing state change");
            channel.publish(change);
        }
    }

    /// Push a command to the global channel.
    pub fn publish_command(&self, command: &StoreCommand) {
        self.commands.publish(command);
    }

    /// Observe every command.
    pub fn subscribe_commands(
        &self,
        observer: impl Observer<StoreCommand> + 'static,
    ) -> Subscription {
        self.commands.subscribe(observer)
    }

    /// Complete every observer and drop all path channels. Idempotent.
    pub fn close_all(&self) {
        let channels: Vec<Channel<StateChange>> = self
            .channels
            .borrow_mut()
            .drain()
            .map(|(_, channel)| channel)
            .collect();
        for channel in channels {
            channel.close();
        }
        self.commands.close();
    }
}
