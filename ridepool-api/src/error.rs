use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Forbidden(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    /// Admission pipeline rejection: client identity is blacklisted.
    Blocked(String),
    /// Admission pipeline rejection: per-identity token bucket exhausted.
    RateLimited,
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Blocked(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "too many requests - please try again later".to_string(),
            ),
            AppError::Internal(msg) => {
                tracing::error!("internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ridepool_core::Error> for AppError {
    fn from(err: ridepool_core::Error) -> Self {
        use ridepool_core::Error as E;
        match err {
            E::NotFound(msg) => AppError::NotFound(msg),
            E::Conflict(msg) => AppError::Conflict(msg),
            E::Forbidden(msg) => AppError::Forbidden(msg),
            E::Unauthorized(msg) => AppError::Unauthorized(msg),
            E::Validation(msg) => AppError::Validation(msg),
            E::Store(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
