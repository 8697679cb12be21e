//! Durable string key/value storage for job-tracking state.
//!
//! The tracker only ever needs a handful of keys, so the interface is a plain
//! string map with an explicit lifecycle. [`MemoryStore`] backs tests and
//! [`SqliteStore`] survives process restarts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod error;
pub mod sqlite;

pub use error::StoreError;
pub use sqlite::SqliteStore;

pub trait KeyValueStore: Send + Sync {
    /// Prepares the backing storage. Safe to call more than once.
    fn init(&self) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`, for recovery scenarios.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.write().clear();
        Ok(())
    }
}

/// Returns the default store location: `<data dir>/docket/docket.db`,
/// falling back to the working directory when no data dir is known.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("docket"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docket.db")
}
