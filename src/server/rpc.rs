//! HTTP routing for the `SyncService` calls.
//!
//! Each unary call is a `POST` of its JSON-encoded request message to the
//! method path, answered with a JSON [`SyncResponse`]:
//!
//! - `POST /sync.SyncService/SyncResource`
//! - `POST /sync.SyncService/SyncNamespace`
//! - `GET /health`: backend status (not subject to the concurrency limit)

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::Serialize;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handler::SyncHandler;
use super::messages::{SyncNamespaceRequest, SyncResourceRequest, SyncResponse};
use crate::storage::StorageBackend;

pub const SYNC_RESOURCE_PATH: &str = "/sync.SyncService/SyncResource";
pub const SYNC_NAMESPACE_PATH: &str = "/sync.SyncService/SyncNamespace";

/// Builds the service router.
///
/// At most `max_workers` sync calls are processed at once; further calls wait
/// for a free slot.
pub fn router<B: StorageBackend + 'static>(handler: SyncHandler<B>, max_workers: usize) -> Router {
    Router::new()
        .route(SYNC_RESOURCE_PATH, post(sync_resource::<B>))
        .route(SYNC_NAMESPACE_PATH, post(sync_namespace::<B>))
        .layer(GlobalConcurrencyLimitLayer::new(max_workers.max(1)))
        .route("/health", get(health::<B>))
        .with_state(handler)
        .layer(TraceLayer::new_for_http())
}

async fn sync_resource<B: StorageBackend + 'static>(
    State(handler): State<SyncHandler<B>>,
    Json(request): Json<SyncResourceRequest>,
) -> Json<SyncResponse> {
    Json(handler.sync_resource(request).await)
}

async fn sync_namespace<B: StorageBackend + 'static>(
    State(handler): State<SyncHandler<B>>,
    Json(request): Json<SyncNamespaceRequest>,
) -> Json<SyncResponse> {
    Json(handler.sync_namespace(request).await)
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend: &'static str,
}

async fn health<B: StorageBackend + 'static>(
    State(handler): State<SyncHandler<B>>,
) -> (StatusCode, Json<HealthResponse>) {
    let backend = handler.backend();
    let (code, status) = if backend.is_connected().await {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            backend: backend.name(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::MemoryBackend;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(backend: MemoryBackend) -> Router {
        router(SyncHandler::new(Arc::new(backend)), 4)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_sync_resource_round_trip() {
        let app = app(MemoryBackend::connected());

        let request = json_request(
            SYNC_RESOURCE_PATH,
            json!({
                "event_type": "ADDED",
                "resource_type": "pod",
                "namespace": "default",
                "name": "mypod",
                "cluster": "c1",
                "uid": "uid-123",
                "data_json": "{\"foo\":\"bar\"}"
            }),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Successfully synced pod mypod");

        let request = json_request(
            SYNC_RESOURCE_PATH,
            json!({
                "event_type": "DELETED",
                "resource_type": "pod",
                "name": "mypod",
                "uid": "uid-123",
                "data_json": "{}"
            }),
        );
        let body = read_json(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Successfully deleted pod mypod");
    }

    #[tokio::test]
    async fn test_sync_namespace_without_uid() {
        let app = app(MemoryBackend::connected());

        let request = json_request(
            SYNC_NAMESPACE_PATH,
            json!({"event_type": "ADDED", "name": "default", "data_json": "{}"}),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No UID provided");
    }

    #[tokio::test]
    async fn test_handler_failure_is_still_ok_status() {
        let app = app(MemoryBackend::default());

        let request = json_request(
            SYNC_NAMESPACE_PATH,
            json!({"event_type": "ADDED", "name": "default", "uid": "ns-1", "data_json": "{}"}),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error: Database not connected");
    }

    #[tokio::test]
    async fn test_health_reports_backend() {
        let app = app(MemoryBackend::connected());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "memory");
    }

    #[tokio::test]
    async fn test_health_when_disconnected() {
        let app = app(MemoryBackend::default());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(read_json(response).await["status"], "degraded");
    }
}
