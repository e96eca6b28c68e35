//! Error types for the waiting room.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a [`QueueStore`](super::QueueStore) backend.
///
/// Every variant is transient from the caller's point of view: the store is
/// the sole owner of queue state, so nothing was applied locally and the same
/// request can be retried.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Could not reach the store.
    #[error("store connection error: {0}")]
    Connection(String),

    /// The store rejected or failed a command.
    #[error("store command failed: {0}")]
    Command(String),

    /// A stored value could not be decoded.
    #[error("corrupt value in store: {0}")]
    Corrupt(String),

    /// The store is temporarily unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            StoreError::Connection(err.to_string())
        } else if err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// Errors returned by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The request was rejected before touching the store.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store failed; safe to retry.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A store round-trip exceeded the configured deadline.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

impl QueueError {
    /// Whether the caller may retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Store(_) | QueueError::Timeout(_))
    }
}
