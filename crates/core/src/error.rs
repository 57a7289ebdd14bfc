//! Error types for the entity store
//!
//! Two layers of errors exist:
//!
//! - [`StorageError`] is what a backend reports. It separates transient
//!   failures (worth retrying) from permanent ones.
//! - [`Error`] is what every store operation returns. Its variants follow the
//!   store's taxonomy and carry a canonical wire code.
//!
//! ## Error Codes (Canonical)
//!
//! | Code | HTTP | Description |
//! |------|------|-------------|
//! | NotFound | 404 | Entity absent on get/mutate |
//! | Conflict | 409 | Duplicate id on create |
//! | Validation | 400 | Malformed or empty required field, unknown cursor |
//! | StorageError | 503 | Backend I/O failure after retries |
//! | Serialization | 500 | Stored blob failed to decode |
//! | Internal | 500 | Bug or invariant violation |

use thiserror::Error;

/// Failure reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Transient failure (timeout, dropped connection, overloaded shard).
    ///
    /// Safe to retry with backoff.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Permanent failure. Retrying will not help.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl StorageError {
    /// Check if this failure may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Result type for backend operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// All entity store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Entity absent on get/mutate
    #[error("{collection}/{id} not found")]
    NotFound {
        /// Collection that was searched
        collection: String,
        /// Missing entity id
        id: String,
    },

    /// Duplicate id on create
    #[error("{collection}/{id} already exists")]
    Conflict {
        /// Collection the id collided in
        collection: String,
        /// Colliding entity id
        id: String,
    },

    /// Malformed or empty required field in proposed state
    #[error("validation failed: {0}")]
    Validation(String),

    /// Backend I/O failure (already retried where transient)
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored bytes could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Bug or invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for entity store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a NotFound error.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Build a Conflict error.
    pub fn conflict(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::Conflict {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Build a Validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Error::Validation(reason.into())
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this error is retryable.
    ///
    /// Only transient backend failures qualify. NotFound, Conflict and
    /// Validation are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_transient())
    }

    /// Canonical wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NotFound",
            Error::Conflict { .. } => "Conflict",
            Error::Validation(_) => "Validation",
            Error::Storage(_) => "StorageError",
            Error::Serialization(_) => "Serialization",
            Error::Internal(_) => "Internal",
        }
    }

    /// HTTP status the request layer maps this error to.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Conflict { .. } => 409,
            Error::Validation(_) => 400,
            Error::Storage(_) => 503,
            Error::Serialization(_) | Error::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
