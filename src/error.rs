//! Error types for the storage layer.
//!
//! Only configuration and connectivity problems are errors. A write or delete
//! that the store rejects is an ordinary outcome and is reported as `Ok(false)`
//! by the backend operations.

use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection settings are missing or invalid, or the backend selector is unknown.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The store could not be reached or rejected the handshake.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A data operation was attempted before a successful `connect()`.
    #[error("Database not connected")]
    NotConnected,
}

pub type StorageResult<T> = Result<T, StorageError>;
