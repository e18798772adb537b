//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Could not acquire a pooled connection in time.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Serialization/deserialization error for JSON columns.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A row violates a storage invariant (unknown status spelling,
    /// suspension metadata on a non-suspended row, bad timestamp).
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// True for transient failures worth retrying: lock contention and
    /// pool-acquisition timeouts. Everything else is permanent for the
    /// requesting operation.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Pool(_) => true,
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
