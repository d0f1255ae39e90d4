//! Storage layer
//!
//! Durable key-value storage for persisted deck state.
//!
//! ## Backends
//!
//! - **FileStore**: one JSON file per key in the data directory, written
//!   atomically
//! - **MemoryStore**: in-process map, used in tests and for throwaway
//!   sessions
//!
//! Values are opaque serialized strings at this layer; typed access lives
//! in [`crate::persistent::PersistentState`].

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Durable key-value storage boundary
///
/// Implementations must tolerate absent keys (first run) by returning
/// `Ok(None)`. They never panic on I/O failure; callers decide whether a
/// failure is fatal.
pub trait KeyValueStore: Send + Sync {
    /// Load the serialized value stored under `key`
    fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn store(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove the value stored under `key` (no-op when absent)
    fn remove(&self, key: &str) -> StorageResult<()>;
}
