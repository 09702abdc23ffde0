use super::{middleware, probes, ApiError};
use crate::{ApiMetrics, Producer};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use task_queue_core::{Task, TaskStatus};
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub producer: Producer,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(producer: Producer, metrics: Arc<ApiMetrics>) -> Self {
        AppState { producer, metrics }
    }
}

/// REST API routes. Request bodies are not size-capped; payloads of any
/// length are accepted.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(probes::health))
        .route("/ready", get(probes::ready))
        .route("/metrics", get(probes::metrics))
        .route("/tasks", post(create_task))
        .route("/tasks/:id", get(get_task))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_metrics,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    #[serde(default)]
    payload: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateTaskResponse {
    task_id: String,
    status: TaskStatus,
}

#[derive(Debug, Serialize)]
struct TaskStatusResponse {
    task: Task,
}

/// Submit a new task. The body is parsed by hand so that any malformed
/// input, whatever its content type, is a plain 400.
async fn create_task(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateTaskResponse>), ApiError> {
    let req: CreateTaskRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid request body".to_string()))?;

    let task = state.producer.create(req.payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTaskResponse {
            task_id: task.id.to_string(),
            status: task.status,
        }),
    ))
}

/// Get task by ID
async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let task = state.producer.status(&task_id).await?;
    Ok(Json(TaskStatusResponse { task }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request},
        response::Response,
    };
    use serde_json::Value;
    use task_queue_core::{MemoryStore, TaskRepository, QUEUE_KEY};
    use tower::ServiceExt;

    fn app() -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(ApiMetrics::new().unwrap());
        let producer = Producer::new(TaskRepository::new(store.clone()), metrics.clone());
        (store, create_router(AppState::new(producer, metrics)))
    }

    fn post_tasks(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/tasks")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_query() {
        let (store, app) = app();

        let response = app.clone().oneshot(post_tasks(r#"{"payload":"hello"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert_eq!(created["status"], "pending");
        let task_id = created["task_id"].as_str().unwrap().to_string();
        assert_eq!(store.list(QUEUE_KEY), vec![task_id.clone()]);

        let response = app.oneshot(get(&format!("/tasks/{}", task_id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = json_body(response).await;
        assert_eq!(fetched["task"]["id"], task_id);
        assert_eq!(fetched["task"]["payload"], "hello");
        assert_eq!(fetched["task"]["status"], "pending");
    }

    #[tokio::test]
    async fn test_missing_payload_is_bad_request() {
        let (store, app) = app();

        for body in ["{}", r#"{"payload":""}"#, r#"{"payload":null}"#] {
            let response = app.clone().oneshot(post_tasks(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }

        assert_eq!(store.record_count(), 0);
        assert!(store.list(QUEUE_KEY).is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_body_is_bad_request() {
        let (_, app) = app();

        for body in ["", "not json", r#"{"payload":42}"#] {
            let response = app.clone().oneshot(post_tasks(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_content_type_not_required() {
        let (_, app) = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/tasks")
            .body(Body::from(r#"{"payload":"x"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let (_, app) = app();

        let response = app.oneshot(get("/tasks/unknown-id")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Task not found");
    }

    #[tokio::test]
    async fn test_store_down_is_internal_error() {
        let (store, app) = app();
        store.set_offline(true);

        let response = app.clone().oneshot(post_tasks(r#"{"payload":"hello"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = app.oneshot(get("/tasks/some-id")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_enqueue_failure_is_internal_error() {
        let (store, app) = app();
        store.set_fail_pushes(true);

        let response = app.oneshot(post_tasks(r#"{"payload":"hello"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Failed to enqueue task");

        // The record is written before the push, so it is left behind unqueued
        assert_eq!(store.record_count(), 1);
        assert!(store.list(QUEUE_KEY).is_empty());
    }

    #[tokio::test]
    async fn test_large_payload_is_accepted() {
        let (_, app) = app();
        let payload = "x".repeat(3 * 1024 * 1024);
        let body = serde_json::json!({ "payload": payload }).to_string();

        let response = app.clone().oneshot(post_tasks(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let task_id = json_body(response).await["task_id"].as_str().unwrap().to_string();

        let response = app.oneshot(get(&format!("/tasks/{}", task_id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["task"]["payload"], payload.as_str());
    }

    #[tokio::test]
    async fn test_payload_with_json_metacharacters_round_trips() {
        let (_, app) = app();
        let payload = "quote \" backslash \\ brace {} newline \n tab \t \u{0} émoji 🚀";
        let body = serde_json::json!({ "payload": payload }).to_string();

        let response = app.clone().oneshot(post_tasks(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let task_id = json_body(response).await["task_id"].as_str().unwrap().to_string();

        let response = app.oneshot(get(&format!("/tasks/{}", task_id))).await.unwrap();
        let fetched = json_body(response).await;
        assert_eq!(fetched["task"]["payload"], payload);
        assert_eq!(fetched["task"]["status"], "pending");
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let (store, app) = app();

        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");

        let response = app.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ready");

        store.set_offline(true);
        let response = app.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "not ready");
        assert!(body["reason"].is_string());

        // Liveness does not depend on the store
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let (_, app) = app();
        app.clone().oneshot(post_tasks(r#"{"payload":"hello"}"#)).await.unwrap();

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains("api_tasks_created_total 1"));
        assert!(text.contains("endpoint=\"/tasks\""));
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let (_, app) = app();
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (_, app) = app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/tasks")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }
}
