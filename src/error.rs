//! Error types for Pasture
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Authorization failures (403 family) are kept separate from
/// infrastructure failures (5xx family) so operators can tell
/// "user isn't authorized" apart from "system is broken".
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error (500; fatal at startup, before serving)
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSRF state missing, expired, or replayed (403)
    #[error("OAuth state rejected")]
    CsrfRejected,

    /// Token exchange or identity resolution returned unusable data (403)
    #[error("Upstream authentication failed: {0}")]
    UpstreamAuth(String),

    /// Access denied by a membership requirement (403)
    #[error("Access denied")]
    Forbidden,

    /// Network/timeout failure talking to the identity provider (502)
    #[error("Upstream provider error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Key-value store failure (503)
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::CsrfRejected => (StatusCode::FORBIDDEN, self.to_string(), "csrf_rejected"),
            AppError::UpstreamAuth(msg) => (StatusCode::FORBIDDEN, msg.clone(), "upstream_auth"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string(), "forbidden"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "upstream"),
            AppError::Store(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Store error".to_string(),
                "store",
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
