//! MongoDB-backed document store.
//!
//! Each resource type is its own collection and every stored document uses
//! the resource `uid` as its `_id`. Namespaces live in the fixed `namespace`
//! collection and go through the same code path as any other resource type.

use async_trait::async_trait;
use mongodb::bson::{self, doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use serde_json::Value;
use std::future::IntoFuture;
use tokio::sync::RwLock;
use tokio::time::{timeout, timeout_at, Instant};

use super::{StorageBackend, CONNECT_TIMEOUT, OPERATION_TIMEOUT};
use crate::config::MongoConfig;
use crate::error::{StorageError, StorageResult};
use crate::models::NAMESPACE_RESOURCE_TYPE;

/// Live client plus the database handle derived from it.
#[derive(Debug, Clone)]
struct Connection {
    client: Client,
    db: Database,
}

/// Storage backend over a MongoDB database.
#[derive(Debug)]
pub struct DocumentStoreBackend {
    config: MongoConfig,
    connection: RwLock<Option<Connection>>,
}

impl DocumentStoreBackend {
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            connection: RwLock::new(None),
        }
    }

    async fn database(&self) -> StorageResult<Database> {
        self.connection
            .read()
            .await
            .as_ref()
            .map(|conn| conn.db.clone())
            .ok_or(StorageError::NotConnected)
    }

    async fn open(&self, uri: &str) -> StorageResult<Connection> {
        // Parsing a mongodb+srv URI resolves DNS records, so it shares the
        // connect deadline with the ping below.
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        let mut options = match timeout_at(deadline, ClientOptions::parse(uri)).await {
            Ok(Ok(options)) => options,
            Ok(Err(e)) => return Err(parse_error(e)),
            Err(_) => return Err(connect_timed_out()),
        };
        options.server_selection_timeout = Some(CONNECT_TIMEOUT);
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.app_name.get_or_insert_with(|| "shield-receiver".to_string());

        let client = Client::with_options(options).map_err(connection_error)?;

        // The client connects lazily; ping to surface failures now.
        let ping = {
            let admin = client.database("admin");
            timeout_at(deadline, admin.run_command(doc! { "ping": 1 }).into_future()).await
        };
        let failure = match ping {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(connection_error(e)),
            Err(_) => Some(connect_timed_out()),
        };
        if let Some(err) = failure {
            client.shutdown().await;
            return Err(err);
        }

        let db = client.database(&self.config.database);
        Ok(Connection { client, db })
    }
}

fn connection_error(cause: impl std::fmt::Display) -> StorageError {
    StorageError::Connection(format!("Failed to connect to MongoDB: {}", cause))
}

fn connect_timed_out() -> StorageError {
    connection_error(format!("no response within {}s", CONNECT_TIMEOUT.as_secs()))
}

/// Classifies a URI parse failure: lookups that hit the network are
/// connection problems, everything else is a bad URI.
fn parse_error(e: mongodb::error::Error) -> StorageError {
    match e.kind.as_ref() {
        ErrorKind::DnsResolve { .. } | ErrorKind::Io(_) => connection_error(e),
        _ => StorageError::Configuration(format!("Invalid MONGO_URI: {}", e)),
    }
}

/// Builds the stored document: the payload with `_id` forced to `uid`.
///
/// Returns `None` if the payload is not a JSON object or cannot be
/// represented as BSON.
fn to_stored_document(uid: &str, doc: &Value) -> Option<Document> {
    let mut document = match bson::to_document(doc) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Cannot store document {} as BSON: {}", uid, e);
            return None;
        }
    };
    document.insert("_id", uid);
    Some(document)
}

#[async_trait]
impl StorageBackend for DocumentStoreBackend {
    async fn connect(&self) -> StorageResult<()> {
        let mut connection = self.connection.write().await;
        if connection.is_some() {
            return Ok(());
        }

        let uri = match self.config.uri.as_deref().map(str::trim) {
            Some(uri) if !uri.is_empty() => uri.to_string(),
            _ => return Err(StorageError::Configuration("MONGO_URI is not set".to_string())),
        };

        *connection = Some(self.open(&uri).await?);
        tracing::info!("Connected to MongoDB database {}", self.config.database);
        Ok(())
    }

    async fn disconnect(&self) {
        let connection = self.connection.write().await.take();
        if let Some(conn) = connection {
            conn.client.shutdown().await;
            tracing::info!("Disconnected from MongoDB");
        }
    }

    async fn upsert_resource(
        &self,
        resource_type: &str,
        uid: &str,
        doc: &Value,
    ) -> StorageResult<bool> {
        let db = self.database().await?;
        let Some(document) = to_stored_document(uid, doc) else {
            return Ok(false);
        };

        let collection = db.collection::<Document>(resource_type);
        let replace = collection
            .replace_one(doc! { "_id": uid }, document)
            .upsert(true);

        match timeout(OPERATION_TIMEOUT, replace.into_future()).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => {
                tracing::warn!("Failed to upsert {}/{}: {}", resource_type, uid, e);
                Ok(false)
            }
            Err(_) => {
                tracing::warn!("Timed out upserting {}/{}", resource_type, uid);
                Ok(false)
            }
        }
    }

    async fn delete_resource(&self, resource_type: &str, uid: &str) -> StorageResult<bool> {
        let db = self.database().await?;
        let collection = db.collection::<Document>(resource_type);
        let delete = collection.delete_one(doc! { "_id": uid });

        match timeout(OPERATION_TIMEOUT, delete.into_future()).await {
            Ok(Ok(result)) => Ok(result.deleted_count > 0),
            Ok(Err(e)) => {
                tracing::warn!("Failed to delete {}/{}: {}", resource_type, uid, e);
                Ok(false)
            }
            Err(_) => {
                tracing::warn!("Timed out deleting {}/{}", resource_type, uid);
                Ok(false)
            }
        }
    }

    async fn upsert_namespace(&self, uid: &str, doc: &Value) -> StorageResult<bool> {
        self.upsert_resource(NAMESPACE_RESOURCE_TYPE, uid, doc).await
    }

    async fn delete_namespace(&self, uid: &str) -> StorageResult<bool> {
        self.delete_resource(NAMESPACE_RESOURCE_TYPE, uid).await
    }

    async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    fn name(&self) -> &'static str {
        "mongo"
    }
}
