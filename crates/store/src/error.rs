//! Store Error Types

use thiserror::Error;

/// Errors from the concept store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data that cannot be interpreted (bad blob, bad timestamp)
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Vector with the wrong dimension, or index failures
    #[error("Index error: {0}")]
    Index(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
