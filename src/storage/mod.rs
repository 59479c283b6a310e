//! Storage backends for synced resources.
//!
//! Every backend implements [`StorageBackend`]. The concrete backend is chosen
//! once at startup by [`create_backend`] and wrapped in the closed [`Backend`]
//! enum; nothing outside this module needs to know which one is active.
//!
//! # Outcome model
//!
//! - `connect()` fails with [`StorageError::Configuration`] or
//!   [`StorageError::Connection`]. Both are fatal at startup.
//! - Data operations return `Ok(true)` / `Ok(false)` for success / store-side
//!   failure, and `Err(StorageError::NotConnected)` if called before
//!   `connect()`.

pub mod document;
pub mod relational;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::ReceiverConfig;
use crate::error::{StorageError, StorageResult};

pub use document::DocumentStoreBackend;
pub use relational::RelationalStoreBackend;

/// Upper bound on establishing and verifying a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on a single upsert or delete.
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Persistence contract shared by all backends.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Establishes and verifies connectivity. Calling it again while
    /// connected is a no-op.
    async fn connect(&self) -> StorageResult<()>;

    /// Releases the connection. Safe to call when never connected.
    async fn disconnect(&self);

    /// Inserts or fully replaces the record `uid` within `resource_type`.
    async fn upsert_resource(&self, resource_type: &str, uid: &str, doc: &Value)
        -> StorageResult<bool>;

    /// Removes the record `uid` within `resource_type`.
    ///
    /// Returns `Ok(true)` only if a record was actually removed.
    async fn delete_resource(&self, resource_type: &str, uid: &str) -> StorageResult<bool>;

    async fn upsert_namespace(&self, uid: &str, doc: &Value) -> StorageResult<bool>;

    async fn delete_namespace(&self, uid: &str) -> StorageResult<bool>;

    /// Returns true once `connect()` has succeeded and until `disconnect()`.
    async fn is_connected(&self) -> bool;

    /// Short backend name used in logs and health output.
    fn name(&self) -> &'static str;
}

/// Recognized values of the backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    DocumentStore,
    Relational,
}

impl StoreKind {
    /// Parse a backend selector. An unset selector means the document store.
    pub fn parse(selector: Option<&str>) -> StorageResult<Self> {
        let selector = selector.map(|s| s.trim().to_lowercase());
        match selector.as_deref() {
            None | Some("") | Some("mongo") => Ok(StoreKind::DocumentStore),
            Some("postgres") | Some("postgresql") => Ok(StoreKind::Relational),
            Some(other) => Err(StorageError::Configuration(format!(
                "Unsupported DATABASE_TYPE: {}",
                other
            ))),
        }
    }
}

/// The active storage backend.
#[derive(Debug)]
pub enum Backend {
    Document(DocumentStoreBackend),
    Relational(RelationalStoreBackend),
}

impl Backend {
    pub fn kind(&self) -> StoreKind {
        match self {
            Backend::Document(_) => StoreKind::DocumentStore,
            Backend::Relational(_) => StoreKind::Relational,
        }
    }
}

/// Builds the backend named by `config.database_type`.
///
/// The backend is returned unconnected; call [`StorageBackend::connect`]
/// before serving.
pub fn create_backend(config: &ReceiverConfig) -> StorageResult<Backend> {
    let backend = match StoreKind::parse(config.database_type.as_deref())? {
        StoreKind::DocumentStore => {
            Backend::Document(DocumentStoreBackend::new(config.mongo.clone()))
        }
        StoreKind::Relational => Backend::Relational(RelationalStoreBackend::new(
            config.postgres.clone(),
            config.max_workers as u32,
        )),
    };
    tracing::debug!("Selected {} storage backend", backend.name());
    Ok(backend)
}

#[async_trait]
impl StorageBackend for Backend {
    async fn connect(&self) -> StorageResult<()> {
        match self {
            Backend::Document(b) => b.connect().await,
            Backend::Relational(b) => b.connect().await,
        }
    }

    async fn disconnect(&self) {
        match self {
            Backend::Document(b) => b.disconnect().await,
            Backend::Relational(b) => b.disconnect().await,
        }
    }

    async fn upsert_resource(
        &self,
        resource_type: &str,
        uid: &str,
        doc: &Value,
    ) -> StorageResult<bool> {
        match self {
            Backend::Document(b) => b.upsert_resource(resource_type, uid, doc).await,
            Backend::Relational(b) => b.upsert_resource(resource_type, uid, doc).await,
        }
    }

    async fn delete_resource(&self, resource_type: &str, uid: &str) -> StorageResult<bool> {
        match self {
            Backend::Document(b) => b.delete_resource(resource_type, uid).await,
            Backend::Relational(b) => b.delete_resource(resource_type, uid).await,
        }
    }

    async fn upsert_namespace(&self, uid: &str, doc: &Value) -> StorageResult<bool> {
        match self {
            Backend::Document(b) => b.upsert_namespace(uid, doc).await,
            Backend::Relational(b) => b.upsert_namespace(uid, doc).await,
        }
    }

    async fn delete_namespace(&self, uid: &str) -> StorageResult<bool> {
        match self {
            Backend::Document(b) => b.delete_namespace(uid).await,
            Backend::Relational(b) => b.delete_namespace(uid).await,
        }
    }

    async fn is_connected(&self) -> bool {
        match self {
            Backend::Document(b) => b.is_connected().await,
            Backend::Relational(b) => b.is_connected().await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Backend::Document(b) => b.name(),
            Backend::Relational(b) => b.name(),
        }
    }
}
