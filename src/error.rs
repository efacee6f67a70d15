use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use compute::ComputeError;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Errors a handler can answer with. Every variant renders as an
/// [`ErrorResponse`] body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// A unique row already exists. Reported as a client error.
    #[error("{0}")]
    Duplicate(String),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Details are logged, never returned to the client.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Duplicate(_) => (StatusCode::BAD_REQUEST, "DUPLICATE"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Request failed: {}", detail);
        }

        let (status, code) = self.status_and_code();
        let field = match &self {
            ApiError::Validation { field, .. } => field.clone(),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            success: false,
            field,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ComputeError> for ApiError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Validation { field, message } => ApiError::Validation {
                field: Some(field.to_string()),
                message,
            },
            ComputeError::Duplicate(message) => ApiError::Duplicate(message),
            ComputeError::NotFound(message) => ApiError::NotFound(message),
            ComputeError::Forbidden(message) => ApiError::Forbidden(message),
            ComputeError::Database(db) => ApiError::Internal(db.to_string()),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        ComputeError::from(err).into()
    }
}
