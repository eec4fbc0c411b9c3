//! Error types for DisputeDB core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the engine and the record store.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] disputedb_storage::StorageError),

    /// Record codec error.
    #[error("codec error: {0}")]
    Codec(#[from] disputedb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No record exists under the given id.
    ///
    /// Raised by `get` and `update` only; `create` and `delete` treat an
    /// absent id as part of their normal contract.
    #[error("record not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The WAL contains an invalid or corrupted record.
    #[error("WAL corruption: {message}")]
    WalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Another process holds the engine's file lock and did not release
    /// it within the configured timeout.
    #[error("lock acquisition timed out: another process holds the store lock")]
    LockTimeout,

    /// A transaction referenced a bucket that was never created.
    #[error("bucket missing: {name}")]
    BucketMissing {
        /// Name of the missing bucket.
        name: String,
    },

    /// The engine has been closed.
    #[error("engine is closed")]
    EngineClosed,

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a not-found error for `id`.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a WAL corruption error.
    pub fn wal_corruption(message: impl Into<String>) -> Self {
        Self::WalCorruption {
            message: message.into(),
        }
    }

    /// Creates a missing-bucket error.
    pub fn bucket_missing(name: impl Into<String>) -> Self {
        Self::BucketMissing { name: name.into() }
    }

    /// Creates an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
