use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::repo::StoreError;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Errors surfaced by HTTP handlers and the auth gate.
///
/// Response bodies are deliberately coarse: credential and token failures never
/// say which check failed, and internal failures carry no detail.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}: {1:?}")]
    Validation(&'static str, Vec<FieldError>),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("request carries no authenticated identity")]
    NotAuthenticated,

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("connection pool exhausted")]
    ResourceExhausted,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_errors: Option<Vec<FieldError>>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(..) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::MissingToken | AppError::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InvalidToken => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ResourceExhausted | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> &'static str {
        match *self {
            AppError::Validation(msg, _) => msg,
            AppError::InvalidCredentials => "Invalid credentials",
            AppError::MissingToken => "Access token required",
            AppError::InvalidToken => "Invalid or expired token",
            AppError::NotAuthenticated => "Not authenticated",
            AppError::Conflict(msg) => msg,
            AppError::ResourceExhausted | AppError::Unexpected(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Unexpected(e) => error!(error = ?e, "unhandled internal error"),
            AppError::ResourceExhausted => error!("database pool exhausted"),
            _ => {}
        }

        let body = ErrorBody {
            error: self.message(),
            validation_errors: match self {
                AppError::Validation(_, fields) => Some(fields),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AppError::Conflict("Email already registered"),
            StoreError::PoolExhausted => AppError::ResourceExhausted,
            StoreError::Database(e) => AppError::Unexpected(anyhow::Error::new(e)),
        }
    }
}
