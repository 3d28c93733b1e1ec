use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::store::StoreError;
use crate::uploads::UploadError;

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    ValidationError(String),
    PayloadTooLarge,
    InternalError(String),
}

/// Convert our custom errors to HTTP responses
///
/// Validation messages go back verbatim; storage failures are logged and
/// reported as a generic 500.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Post not found".to_string()),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Upload is too large".to_string(),
            ),
            ApiError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
        };

        (
            status,
            Json(serde_json::json!({
              "error": message
            })),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => ApiError::ValidationError(msg),
            StoreError::NotFound(_) => ApiError::NotFound,
            StoreError::Storage(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::EmptyPayload => ApiError::ValidationError(err.to_string()),
            UploadError::PayloadStream { source } => match source.downcast_ref::<MultipartError>() {
                Some(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
                _ => ApiError::ValidationError("Failed to read uploaded file".into()),
            },
            other => ApiError::InternalError(other.to_string()),
        }
    }
}
