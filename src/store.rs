//! Observable wrapper around the wizard state.
//!
//! Every mutation goes through [`ReactiveStore::set`] or
//! [`ReactiveStore::remove`], which notify subscribed listeners with the
//! changed path and the old and new values. Listeners cannot borrow the store
//! while it is notifying; instead they queue further writes through
//! [`Followups`], which the store applies once the current round finishes.

use crate::paths;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{trace, warn};

/// A single observed mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub path: String,
    pub old: Option<Value>,
    /// `None` when the value was removed.
    pub new: Option<Value>,
}

/// Handle returned by [`ReactiveStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Writes requested by listeners during a notification round.
#[derive(Debug, Default)]
pub struct Followups {
    pending: Vec<(String, Value)>,
}

impl Followups {
    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.pending.push((path.into(), value));
    }
}

pub type Listener = Box<dyn FnMut(&Change, &mut Followups)>;

/// Nested state with change notification.
pub struct ReactiveStore {
    data: Value,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for ReactiveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveStore")
            .field("data", &self.data)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ReactiveStore {
    fn default() -> Self {
        ReactiveStore::new(Value::Object(serde_json::Map::new()))
    }
}

impl ReactiveStore {
    pub fn new(data: Value) -> Self {
        ReactiveStore {
            data,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// The whole state tree.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Current value at `path`, or `None` if any intermediate key is absent.
    pub fn get(&self, path: &str) -> Option<&Value> {
        paths::resolve(&self.data, path)
    }

    /// String value at `path`, or `""` when absent or not a string.
    pub fn get_str(&self, path: &str) -> &str {
        self.get(path).and_then(Value::as_str).unwrap_or("")
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Change, &mut Followups) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Assigns `value` at `path`.
    ///
    /// Strings are trimmed before comparison and storage. Listeners fire only
    /// when the stored value actually changes. Returns whether it changed.
    /// A named key under an existing array is refused and leaves the rows intact.
    pub fn set(&mut self, path: &str, value: Value) -> bool {
        let mut queue = VecDeque::from([(path.to_string(), value)]);
        let mut changed_first = None;

        while let Some((path, value)) = queue.pop_front() {
            let changed = match self.apply_set(&path, value) {
                Some(change) => {
                    let followups = self.notify(&change);
                    queue.extend(followups);
                    true
                }
                None => false,
            };
            changed_first.get_or_insert(changed);
        }

        changed_first.unwrap_or(false)
    }

    /// Removes the value at `path`; array rows after it shift down.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let old = paths::remove(&mut self.data, path)?;
        let change = Change {
            path: path.to_string(),
            old: Some(old.clone()),
            new: None,
        };
        let followups = self.notify(&change);
        for (path, value) in followups {
            self.set(&path, value);
        }
        Some(old)
    }

    /// Replaces the state without notifying listeners.
    pub fn replace(&mut self, data: Value) -> Value {
        std::mem::replace(&mut self.data, data)
    }

    fn apply_set(&mut self, path: &str, value: Value) -> Option<Change> {
        let value = match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        };

        if paths::resolve(&self.data, path) == Some(&value) {
            return None;
        }
        if !paths::is_assignable(&self.data, path) {
            warn!(path, "named key under an array, value dropped");
            return None;
        }

        let old = paths::assign(&mut self.data, path, value.clone());
        trace!(path, "state changed");
        Some(Change {
            path: path.to_string(),
            old,
            new: Some(value),
        })
    }

    fn notify(&mut self, change: &Change) -> Vec<(String, Value)> {
        let mut followups = Followups::default();
        for (_, listener) in self.listeners.iter_mut() {
            listener(change, &mut followups);
        }
        followups.pending
    }
}
