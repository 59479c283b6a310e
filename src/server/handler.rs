//! Maps sync requests onto storage operations.
//!
//! Every request produces a [`SyncResponse`]. Decode failures and backend
//! errors are caught here and reported as `success = false`; nothing
//! propagates to the transport.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use super::messages::{SyncNamespaceRequest, SyncResourceRequest, SyncResponse};
use crate::error::{StorageError, StorageResult};
use crate::models::{EventType, NamespaceRecord, ResourceRecord};
use crate::storage::{Backend, StorageBackend};

/// Message returned when an upsert event carries no uid.
pub const NO_UID_MESSAGE: &str = "No UID provided";

/// Failures caught at the handler boundary.
#[derive(Debug, Error)]
enum HandlerError {
    #[error("{0}")]
    Payload(#[from] serde_json::Error),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Runs a storage operation on its own task.
///
/// If the caller's future is dropped mid-request the spawned task still runs
/// to completion, so a write is never abandoned halfway.
async fn run_storage<F>(operation: F) -> Result<bool, HandlerError>
where
    F: Future<Output = StorageResult<bool>> + Send + 'static,
{
    Ok(tokio::spawn(operation).await??)
}

fn deleted_response(label: &str, deleted: bool) -> SyncResponse {
    if deleted {
        tracing::info!("Deleted {}", label);
        SyncResponse::success(format!("Successfully deleted {}", label))
    } else {
        tracing::warn!("Nothing deleted for {}", label);
        SyncResponse::failure(format!("Failed to delete {}", label))
    }
}

fn synced_response(label: &str, event_type: &str, synced: bool) -> SyncResponse {
    if synced {
        tracing::info!("Synced {} ({})", label, event_type);
        SyncResponse::success(format!("Successfully synced {}", label))
    } else {
        tracing::warn!("Failed to sync {}", label);
        SyncResponse::failure(format!("Failed to sync {}", label))
    }
}

/// Handles `SyncResource` and `SyncNamespace` calls against one backend.
///
/// Holds no state besides the shared backend handle.
pub struct SyncHandler<B = Backend> {
    backend: Arc<B>,
}

impl<B> Clone for SyncHandler<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: StorageBackend + 'static> SyncHandler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Applies a resource change event.
    pub async fn sync_resource(&self, request: SyncResourceRequest) -> SyncResponse {
        let resource_type = request.resource_type.clone();
        let name = request.name.clone();

        match self.handle_resource(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error syncing resource {} {}: {}", resource_type, name, e);
                SyncResponse::failure(format!("Error: {}", e))
            }
        }
    }

    /// Applies a namespace change event.
    pub async fn sync_namespace(&self, request: SyncNamespaceRequest) -> SyncResponse {
        let name = request.name.clone();

        match self.handle_namespace(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error syncing namespace {}: {}", name, e);
                SyncResponse::failure(format!("Error: {}", e))
            }
        }
    }

    async fn handle_resource(
        &self,
        request: SyncResourceRequest,
    ) -> Result<SyncResponse, HandlerError> {
        let data: Value = serde_json::from_str(&request.data_json)?;
        let label = format!("{} {}", request.resource_type, request.name);

        if EventType::is_delete(&request.event_type) {
            let backend = Arc::clone(&self.backend);
            let SyncResourceRequest {
                resource_type, uid, ..
            } = request;
            let deleted =
                run_storage(async move { backend.delete_resource(&resource_type, &uid).await })
                    .await?;

            return Ok(deleted_response(&label, deleted));
        }

        if request.uid.is_empty() {
            tracing::warn!("No UID for {}", label);
            return Ok(SyncResponse::failure(NO_UID_MESSAGE));
        }

        let event_type = request.event_type.clone();
        let resource_type = request.resource_type.clone();
        let uid = request.uid.clone();
        let document = ResourceRecord {
            event_type: request.event_type,
            resource_type: request.resource_type,
            namespace: request.namespace,
            name: request.name,
            cluster: request.cluster,
            data,
        }
        .into_document();

        let backend = Arc::clone(&self.backend);
        let synced = run_storage(async move {
            backend
                .upsert_resource(&resource_type, &uid, &document)
                .await
        })
        .await?;

        Ok(synced_response(&label, &event_type, synced))
    }

    async fn handle_namespace(
        &self,
        request: SyncNamespaceRequest,
    ) -> Result<SyncResponse, HandlerError> {
        let data: Value = serde_json::from_str(&request.data_json)?;
        let label = format!("namespace {}", request.name);

        if EventType::is_delete(&request.event_type) {
            let backend = Arc::clone(&self.backend);
            let uid = request.uid;
            let deleted =
                run_storage(async move { backend.delete_namespace(&uid).await }).await?;

            return Ok(deleted_response(&label, deleted));
        }

        if request.uid.is_empty() {
            tracing::warn!("No UID for {}", label);
            return Ok(SyncResponse::failure(NO_UID_MESSAGE));
        }

        let event_type = request.event_type.clone();
        let uid = request.uid.clone();
        let document = NamespaceRecord {
            event_type: request.event_type,
            name: request.name,
            cluster: request.cluster,
            data,
        }
        .into_document();

        let backend = Arc::clone(&self.backend);
        let synced =
            run_storage(async move { backend.upsert_namespace(&uid, &document).await }).await?;

        Ok(synced_response(&label, &event_type, synced))
    }
}
