//! Application error type shared across services and the API boundary.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use thiserror::Error;

/// Application error, mapped to a distinct HTTP status per kind.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unexpected failure (store I/O, serialization, bugs) → 500
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
    /// Missing organization / user / application / goal → 404
    #[error("{0}")]
    NotFound(String),
    /// Malformed request body or parameters → 400
    #[error("{0}")]
    BadRequest(String),
    /// The organization has no GitHub repository linked → 409
    #[error("{0}")]
    NotConfigured(String),
    /// Stored configuration is unusable (malformed repository URL,
    /// approval without a role) → 422
    #[error("{0}")]
    BadConfig(String),
    /// GitHub or the report generator failed or returned garbage → 502
    #[error("{0}")]
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Internal(e) => {
                tracing::error!("internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotConfigured(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadConfig(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.into())
    }
}
