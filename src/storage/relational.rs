//! PostgreSQL-backed store emulating documents through a JSONB column.
//!
//! Two tables are created on first connect:
//! ```text
//! resources  (uid TEXT PRIMARY KEY, resource_type TEXT NOT NULL, data JSONB NOT NULL)
//! namespaces (uid TEXT PRIMARY KEY, data JSONB NOT NULL)
//! ```
//!
//! `uid` alone is the primary key of `resources`, but deletes also match on
//! `resource_type`. Upserting one uid under two resource types therefore
//! leaves a row that a delete of the other type will not remove.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use tokio::sync::RwLock;
use tokio::time::timeout;

use super::{StorageBackend, CONNECT_TIMEOUT, OPERATION_TIMEOUT};
use crate::config::PostgresConfig;
use crate::error::{StorageError, StorageResult};

const CREATE_RESOURCES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS resources (
        uid TEXT PRIMARY KEY,
        resource_type TEXT NOT NULL,
        data JSONB NOT NULL
    )
"#;

const CREATE_NAMESPACES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS namespaces (
        uid TEXT PRIMARY KEY,
        data JSONB NOT NULL
    )
"#;

const UPSERT_RESOURCE: &str = r#"
    INSERT INTO resources (uid, resource_type, data)
    VALUES ($1, $2, $3)
    ON CONFLICT (uid) DO UPDATE SET
        resource_type = EXCLUDED.resource_type,
        data = EXCLUDED.data
"#;

const DELETE_RESOURCE: &str = "DELETE FROM resources WHERE uid = $1 AND resource_type = $2";

const UPSERT_NAMESPACE: &str = r#"
    INSERT INTO namespaces (uid, data)
    VALUES ($1, $2)
    ON CONFLICT (uid) DO UPDATE SET data = EXCLUDED.data
"#;

const DELETE_NAMESPACE: &str = "DELETE FROM namespaces WHERE uid = $1";

/// Storage backend over a PostgreSQL database.
#[derive(Debug)]
pub struct RelationalStoreBackend {
    config: PostgresConfig,
    max_connections: u32,
    pool: RwLock<Option<PgPool>>,
}

impl RelationalStoreBackend {
    /// Creates an unconnected backend whose pool holds at most
    /// `max_connections` connections.
    pub fn new(config: PostgresConfig, max_connections: u32) -> Self {
        Self {
            config,
            max_connections: max_connections.max(1),
            pool: RwLock::new(None),
        }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
            .application_name("shield-receiver")
    }

    async fn pool(&self) -> StorageResult<PgPool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or(StorageError::NotConnected)
    }

    /// Opens the pool and makes sure both tables exist.
    async fn open_pool(&self) -> Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(self.connect_options())
            .await?;

        for statement in [CREATE_RESOURCES_TABLE, CREATE_NAMESPACES_TABLE] {
            if let Err(e) = sqlx::query(statement).execute(&pool).await {
                pool.close().await;
                return Err(e);
            }
        }

        Ok(pool)
    }

    /// Runs a single write statement and returns the affected row count.
    ///
    /// Store-side errors and timeouts are logged and reported as `None`.
    async fn execute(
        pool: &PgPool,
        query: Query<'_, Postgres, PgArguments>,
        action: &str,
        target: &str,
    ) -> Option<u64> {
        match timeout(OPERATION_TIMEOUT, query.execute(pool)).await {
            Ok(Ok(result)) => Some(result.rows_affected()),
            Ok(Err(e)) => {
                tracing::warn!("Failed to {} {}: {}", action, target, e);
                None
            }
            Err(_) => {
                tracing::warn!("Timed out trying to {} {}", action, target);
                None
            }
        }
    }
}

#[async_trait]
impl StorageBackend for RelationalStoreBackend {
    async fn connect(&self) -> StorageResult<()> {
        let mut pool = self.pool.write().await;
        if pool.is_some() {
            return Ok(());
        }
        if self.config.database.trim().is_empty() {
            return Err(StorageError::Configuration(
                "POSTGRES_DB is not set".to_string(),
            ));
        }

        let opened = match timeout(CONNECT_TIMEOUT, self.open_pool()).await {
            Ok(Ok(opened)) => opened,
            Ok(Err(e)) => {
                return Err(StorageError::Connection(format!(
                    "Failed to connect to Postgres: {}",
                    e
                )))
            }
            Err(_) => {
                return Err(StorageError::Connection(format!(
                    "Failed to connect to Postgres: no response within {}s",
                    CONNECT_TIMEOUT.as_secs()
                )))
            }
        };

        *pool = Some(opened);
        tracing::info!(
            "Connected to Postgres at {}:{}/{}",
            self.config.host,
            self.config.port,
            self.config.database
        );
        Ok(())
    }

    async fn disconnect(&self) {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!("Disconnected from Postgres");
        }
    }

    async fn upsert_resource(
        &self,
        resource_type: &str,
        uid: &str,
        doc: &Value,
    ) -> StorageResult<bool> {
        let pool = self.pool().await?;
        let query = sqlx::query(UPSERT_RESOURCE)
            .bind(uid)
            .bind(resource_type)
            .bind(Json(doc));
        let target = format!("{}/{}", resource_type, uid);
        Ok(Self::execute(&pool, query, "upsert", &target).await.is_some())
    }

    async fn delete_resource(&self, resource_type: &str, uid: &str) -> StorageResult<bool> {
        let pool = self.pool().await?;
        let query = sqlx::query(DELETE_RESOURCE).bind(uid).bind(resource_type);
        let target = format!("{}/{}", resource_type, uid);
        let affected = Self::execute(&pool, query, "delete", &target).await;
        Ok(affected.unwrap_or(0) > 0)
    }

    async fn upsert_namespace(&self, uid: &str, doc: &Value) -> StorageResult<bool> {
        let pool = self.pool().await?;
        let query = sqlx::query(UPSERT_NAMESPACE).bind(uid).bind(Json(doc));
        let target = format!("namespace/{}", uid);
        Ok(Self::execute(&pool, query, "upsert", &target).await.is_some())
    }

    async fn delete_namespace(&self, uid: &str) -> StorageResult<bool> {
        let pool = self.pool().await?;
        let query = sqlx::query(DELETE_NAMESPACE).bind(uid);
        let target = format!("namespace/{}", uid);
        let affected = Self::execute(&pool, query, "delete", &target).await;
        Ok(affected.unwrap_or(0) > 0)
    }

    async fn is_connected(&self) -> bool {
        self.pool.read().await.is_some()
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
