//! Storage error types.
//!
//! Every repository failure carries the operation it came from so it can be
//! logged upstream without the caller re-wrapping it.

use super::timeouts::TimeoutError;
use std::time::Duration;
use thiserror::Error;

/// Failure of a storage collaborator (relational store or ranked store)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Relational database error
    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Query exceeded its read or write timeout
    #[error("{context}: timed out after {elapsed:?}")]
    Timeout {
        context: &'static str,
        elapsed: Duration,
    },

    /// Ranked store error
    #[error("{context}: {source}")]
    Redis {
        context: &'static str,
        #[source]
        source: redis::RedisError,
    },

    /// Stored data could not be decoded
    #[error("{context}: {message}")]
    Corrupt {
        context: &'static str,
        message: String,
    },

    /// Injected failure (in-memory store only)
    #[error("{context}: injected failure")]
    Injected { context: &'static str },
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Attach an operation description to a lower-level error
pub trait Context<T> {
    fn context(self, context: &'static str) -> StoreResult<T>;
}

impl<T> Context<T> for Result<T, sqlx::Error> {
    fn context(self, context: &'static str) -> StoreResult<T> {
        self.map_err(|source| StoreError::Database { context, source })
    }
}

impl<T> Context<T> for Result<T, TimeoutError> {
    fn context(self, context: &'static str) -> StoreResult<T> {
        self.map_err(|err| match err {
            TimeoutError::Timeout(elapsed) => StoreError::Timeout { context, elapsed },
            TimeoutError::Database(source) => StoreError::Database { context, source },
        })
    }
}

impl<T> Context<T> for redis::RedisResult<T> {
    fn context(self, context: &'static str) -> StoreResult<T> {
        self.map_err(|source| StoreError::Redis { context, source })
    }
}
