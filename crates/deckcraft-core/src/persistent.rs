//! Persisted values
//!
//! [`PersistentState`] gives a single value get/set semantics backed by a
//! durable [`KeyValueStore`]. Construction never touches storage; the owner
//! calls [`PersistentState::load`] once to rehydrate. Every `set` writes the
//! new value through, but storage failures are logged and swallowed: the
//! in-memory value always reflects the latest `set`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::storage::{KeyValueStore, StorageError};

/// A value of type `T` persisted under a fixed storage key
pub struct PersistentState<T> {
    key: String,
    value: T,
    storage: Arc<dyn KeyValueStore>,
    loaded: bool,
}

impl<T> PersistentState<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a state holding `default` until [`load`](Self::load) is called
    pub fn new(key: impl Into<String>, default: T, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            key: key.into(),
            value: default,
            storage,
            loaded: false,
        }
    }

    /// Storage key this value is persisted under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether rehydration has already run
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Rehydrate from storage, once
    ///
    /// Replaces the in-memory value when a persisted value exists and parses.
    /// Absent, unreadable or malformed values leave the current value in
    /// place. Returns `true` if a persisted value was applied. Calls after
    /// the first are no-ops.
    pub fn load(&mut self) -> bool {
        if self.loaded {
            return false;
        }
        self.loaded = true;

        let raw = match self.storage.load(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted value for '{}', keeping default", self.key);
                return false;
            }
            Err(e) => {
                warn!("{}", failure_message("reading", &self.key, &e));
                return false;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.value = value;
                debug!("Rehydrated '{}' from storage", self.key);
                true
            }
            Err(source) => {
                let e = StorageError::Serialization {
                    key: self.key.clone(),
                    source,
                };
                warn!(
                    "Ignoring persisted value. {}",
                    failure_message("reading", &self.key, &e)
                );
                false
            }
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value and write it through to storage
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.persist();
    }

    /// Replace the value with `f(previous)` and write it through
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.value);
        self.set(next);
    }

    /// Mutate the value in place and write it through
    pub fn modify(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.persist();
    }

    fn persist(&self) {
        let serialized = match serde_json::to_string(&self.value) {
            Ok(s) => s,
            Err(source) => {
                let e = StorageError::Serialization {
                    key: self.key.clone(),
                    source,
                };
                warn!("{}", failure_message("writing", &self.key, &e));
                return;
            }
        };

        if let Err(e) = self.storage.store(&self.key, &serialized) {
            let message = failure_message("writing", &self.key, &e);
            if e.is_recoverable() {
                warn!("{}", message);
            } else {
                error!("{}", message);
            }
        }
    }
}

/// Log line for a failed storage operation, with a hint when one applies
fn failure_message(action: &str, key: &str, e: &StorageError) -> String {
    let message = format!("Error {} '{}' in storage: {}", action, key, e);
    match e.recovery_suggestion() {
        Some(hint) if !message.contains(hint) => format!("{} {}", message, hint),
        _ => message,
    }
}

impl<T: Clone> PersistentState<T> {
    /// Clone of the current value
    pub fn snapshot(&self) -> T {
        self.value.clone()
    }
}
