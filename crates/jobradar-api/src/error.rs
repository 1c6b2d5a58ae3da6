//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use jobradar_manager::ManagerError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Reverse-index hit whose search entry has expired; the stale
    /// index key has already been deleted.
    #[error("Data stale, repeat the search: {0}")]
    Stale(String),

    /// Reverse-index miss. The original service reports this as a
    /// server-side condition, not a 404.
    #[error("No vacancy found in cache: {0}")]
    CacheMiss(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Search failed: {0}")]
    Manager(#[from] ManagerError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Stale(_) | ApiError::CacheMiss(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Manager(err) => match err {
                ManagerError::CircuitOpen
                | ManagerError::Throttled
                | ManagerError::QueueFull
                | ManagerError::SlotTimeout => StatusCode::SERVICE_UNAVAILABLE,
                ManagerError::WaitTimeout => StatusCode::GATEWAY_TIMEOUT,
                ManagerError::AllSourcesFailed { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Manager(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}
