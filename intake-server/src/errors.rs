//! HTTP-boundary error type. Wraps `intake_core::CoreError` and `anyhow::Error`
//! into a single `IntoResponse` shape, mirroring the reference server's
//! `infra::errors::AppError`: log verbosely at the point of failure, respond
//! tersely to the caller.

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use intake_core::CoreError;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientCapacity { .. } | CoreError::MissingDeadline => {
                tracing::warn!(error = %err, "rejected by ledger");
                Self::conflict(err.to_string())
            }
            CoreError::InvalidRequest(_) => Self::bad_request(err.to_string()),
            CoreError::Persistence(_) => {
                tracing::error!(error = %err, "ledger persistence failed");
                Self::internal("persistence failure; state kept in memory")
            }
            other => {
                tracing::error!(error = %other, "unexpected core error");
                Self::internal("internal error")
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "unhandled error at request boundary");
        Self::internal(err.to_string())
    }
}
