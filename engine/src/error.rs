//! Error types for the Roster engine.
//!
//! These never reach consumers of [`SyncEngine`](crate::SyncEngine): every
//! public engine operation resolves to an outcome value instead. They flow
//! between the engine and its collaborators (cache store, remote service).

use crate::Collection;
use thiserror::Error;

/// Errors raised inside the engine and by its storage collaborators.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("background task failed: {0}")]
    Task(String),
}

/// A rejection from the remote record service.
///
/// Every variant means the same thing to the engine: the operation did not
/// take effect remotely.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    #[error("remote rejected {collection} request: {message}")]
    Rejected {
        collection: Collection,
        message: String,
    },

    #[error("malformed remote response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Create a rejection for a collection.
    pub fn rejected(collection: Collection, message: impl Into<String>) -> Self {
        Self::Rejected {
            collection,
            message: message.into(),
        }
    }
}

/// Result type for engine internals.
pub type Result<T> = std::result::Result<T, Error>;
