//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Document content could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No document under this handle.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The store client has no established session.
    #[error("store session is not authenticated")]
    NotAuthenticated,

    /// The session is not a controller of the document.
    #[error("{controller} is not a controller of document {handle}")]
    Unauthorized { handle: String, controller: String },

    /// Compare-and-swap failed: the document moved on since it was read.
    #[error("version conflict on {handle}: expected version {expected}, current is {actual}")]
    VersionConflict {
        handle: String,
        expected: u64,
        actual: u64,
    },

    /// Stored data failed an integrity check.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Backend failure outside the database itself (lock poisoning, task join).
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
