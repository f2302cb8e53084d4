//! Error types for the storage layer.

use thiserror::Error;

/// Errors from the SQLite storage layer.
///
/// `Busy` is the bounded-wait outcome (lock contention, pool exhaustion) and is
/// safe to retry; `Query` is everything else sqlx can report.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached within the bounded wait; retryable.
    #[error("Storage busy: {reason}")]
    Busy { reason: String },

    /// A query failed for a non-transient reason.
    #[error("Storage error: {reason}")]
    Query {
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The on-disk schema is newer or migration failed.
    #[error("Schema migration failed: {reason}")]
    Migration { reason: String },
}

impl StoreError {
    /// Check if the operation may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy { .. })
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
