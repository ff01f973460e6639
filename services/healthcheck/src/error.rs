use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Central error type for the healthcheck's read facade
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Status file not found")]
    NoSnapshot,

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NoSnapshot => (StatusCode::NOT_FOUND, "Status file not found".to_string()),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
