use crate::services::storage_service::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Request-level failures, rendered as `{error, status}` JSON bodies.
///
/// Backend detail is logged where the call fails; clients only ever see the
/// generic message for storage failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid or missing admin token")]
    Unauthorized,
    #[error("{0}")]
    InvalidInput(String),
    #[error("`{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::Storage(StorageError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Storage(StorageError::NotFound(key)) => format!("`{}` not found", key),
            ApiError::Storage(_) => "storage backend error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
