//! Key/value store error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating the store's directory.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be encoded or decoded.
    #[error("Invalid JSON under key '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,
}
