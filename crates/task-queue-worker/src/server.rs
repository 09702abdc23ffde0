//! Health, readiness and metrics endpoints of the consumer process.

use crate::WorkerMetrics;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use task_queue_core::Store;
use tracing::warn;

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn Store>,
    pub metrics: Arc<WorkerMetrics>,
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

async fn ready_handler(State(state): State<ServerState>) -> impl IntoResponse {
    if let Err(e) = state.store.ping().await {
        warn!("Readiness check failed: {}", e);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "reason": "redis unavailable" })),
        );
    }

    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

async fn metrics_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use task_queue_core::MemoryStore;
    use tower::ServiceExt;

    fn app() -> (Arc<MemoryStore>, Arc<WorkerMetrics>, Router) {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(WorkerMetrics::new().unwrap());
        let router = create_router(ServerState {
            store: store.clone(),
            metrics: metrics.clone(),
        });
        (store, metrics, router)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_ready_follows_store() {
        let (store, _, app) = app();

        let response = app.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        store.set_offline(true);
        let response = app.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let (_, metrics, app) = app();
        metrics.tasks_processed.inc();
        metrics.queue_length.set(3);

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("worker_tasks_processed_total 1"));
        assert!(text.contains("worker_queue_length 3"));
        assert!(text.contains("worker_task_processing_duration_seconds"));
    }
}
