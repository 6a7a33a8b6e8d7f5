//! Error types for the session store.
//!
//! [`EventStoreError`] is the single error surface of the crate. The
//! `From<rusqlite::Error>` conversion classifies lock timeouts as [`Busy`]
//! and constraint violations as [`Conflict`] so every call site gets the
//! distinct kinds without matching on SQLite codes itself.
//!
//! [`Busy`]: EventStoreError::Busy
//! [`Conflict`]: EventStoreError::Conflict

use thiserror::Error;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Database lock timeout; the caller may retry.
    #[error("database busy")]
    Busy,

    /// Unique-constraint or foreign-key violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Uncategorized `SQLite` failure.
    #[error("storage error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// Connection pool failure (backend unavailable or not initialized).
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON (de)serialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Which migration failed and why.
        message: String,
    },

    /// Requested session was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Requested event was not found.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// Requested workspace was not found.
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// Requested branch was not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Requested blob was not found.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// Append could not resolve a parent event.
    #[error("no parent event for session {0}")]
    NoParent(String),

    /// Head-based read on a session whose head is null.
    #[error("session has no head event: {0}")]
    SessionHasNoHead(String),

    /// Attempt to delete an event of a non-deletable type.
    #[error("invalid delete: {0}")]
    InvalidDelete(String),

    /// Checksum mismatch or invariant violation detected on read.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Internal error (e.g. poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for EventStoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            match code.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    return Self::Busy;
                }
                rusqlite::ErrorCode::ConstraintViolation => {
                    return Self::Conflict(
                        message
                            .clone()
                            .unwrap_or_else(|| "constraint violation".to_string()),
                    );
                }
                _ => {}
            }
        }
        Self::Sqlite(err)
    }
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, EventStoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
