// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the encrypted document store.
//!
//! Errors fall into two classes:
//!
//! - **Hard** failures (`Decryption`, `InvalidVersion`, `Backup`,
//!   `UnindexedField`, ...) always propagate to the caller.
//! - **Soft** failures (`StoreIo`) are logged and converted into an empty
//!   result at the repository boundary, so the rest of the wallet stays usable.
//!
//! `Compaction` is never returned by the public API; it exists so the
//! migration engine can log a typed value.

use std::io;

/// Error type for all store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// AEAD authentication failed or the envelope is malformed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// A migration step found a schema version it was not written for.
    #[error("invalid schema version: expected {expected}, found {found}")]
    InvalidVersion { expected: u32, found: u32 },

    /// The pre-migration backup could not be written.
    #[error("backup failed: {0}")]
    Backup(#[source] io::Error),

    /// Underlying file, connection or serialization failure.
    #[error("store I/O error: {0}")]
    StoreIo(String),

    /// Compaction ("shrink") failed. Logged only.
    #[error("compaction failed: {0}")]
    Compaction(String),

    /// A query filter referenced a field that is not stored in cleartext.
    #[error("field `{field}` is not a cleartext index field of `{collection}`")]
    UnindexedField {
        collection: &'static str,
        field: String,
    },

    /// A stored document does not have the shape its collection declares.
    #[error("invalid record in `{collection}`: {reason}")]
    InvalidRecord {
        collection: String,
        reason: String,
    },

    /// The operation was cancelled before it started.
    #[error("operation cancelled")]
    Cancelled,

    /// The store lock was poisoned by a panicking caller.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Soft errors are swallowed (and logged) at the repository boundary.
    pub fn is_soft(&self) -> bool {
        matches!(self, StoreError::StoreIo(_))
    }

    pub(crate) fn invalid_record(collection: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidRecord {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Conversions
// =============================================================================

macro_rules! store_io_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(e: $ty) -> Self {
                    StoreError::StoreIo(e.to_string())
                }
            }
        )*
    };
}

store_io_from!(
    io::Error,
    serde_json::Error,
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<redb::CompactionError> for StoreError {
    fn from(e: redb::CompactionError) -> Self {
        StoreError::Compaction(e.to_string())
    }
}
