//! Shield sync receiver
//!
//! Receives resource and namespace change events from the shield controller
//! and persists them into MongoDB or PostgreSQL.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod storage;

pub use config::{ConfigError, MongoConfig, PostgresConfig, ReceiverConfig};
pub use error::{StorageError, StorageResult};
pub use models::{EventType, NamespaceRecord, ResourceRecord};
pub use server::{SyncHandler, SyncNamespaceRequest, SyncResourceRequest, SyncResponse};
pub use storage::{create_backend, Backend, StorageBackend, StoreKind};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
