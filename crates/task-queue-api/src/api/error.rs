use crate::producer::ProducerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<ProducerError> for ApiError {
    fn from(e: ProducerError) -> Self {
        match e {
            ProducerError::MissingPayload => ApiError::BadRequest(e.to_string()),
            ProducerError::NotFound => ApiError::NotFound(e.to_string()),
            ProducerError::StoreFailed(_) => ApiError::Internal("Failed to store task".to_string()),
            ProducerError::EnqueueFailed(_) => ApiError::Internal("Failed to enqueue task".to_string()),
            ProducerError::ReadFailed(_) => ApiError::Internal("Failed to retrieve task".to_string()),
            ProducerError::ParseFailed(_) => ApiError::Internal("Failed to parse task".to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
