//! In-memory key-value store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::error::{StorageError, StorageResult};
use super::KeyValueStore;

/// Key-value store held in process memory
///
/// Can be switched into an "unavailable" mode where every operation fails,
/// to exercise the recovery paths of callers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory store disabled".to_string()))
        } else {
            Ok(())
        }
    }

    fn with_values<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> StorageResult<T> {
        self.check_available()?;
        let mut values = self
            .values
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(f(&mut values))
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_values(|values| values.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> StorageResult<()> {
        self.with_values(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.with_values(|values| {
            values.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(store.load("cards").unwrap().is_none());

        store.store("cards", "{}").unwrap();
        assert_eq!(store.load("cards").unwrap().as_deref(), Some("{}"));
        assert_eq!(store.len(), 1);

        store.remove("cards").unwrap();
        assert!(store.load("cards").unwrap().is_none());
    }

    #[test]
    fn test_unavailable_fails_every_operation() {
        let store = MemoryStore::new();
        store.store("deckName", "\"a\"").unwrap();
        store.set_unavailable(true);

        assert!(matches!(
            store.load("deckName"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.store("deckName", "\"b\"").is_err());

        store.set_unavailable(false);
        assert_eq!(store.load("deckName").unwrap().as_deref(), Some("\"a\""));
    }
}
