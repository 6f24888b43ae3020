//! Request-level error taxonomy and its HTTP mapping.
//!
//! Every failure a handler can produce collapses into one of these variants:
//! - Validation: malformed or policy-violating input, 400
//! - Authentication: missing/invalid session, 401
//! - NotFound: resource absent or not owned by the caller, 404
//! - Db / Internal: unexpected failure, 500 (cause logged, body generic)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<String>,
    },

    #[error("{0}")]
    Authentication(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn validation_with(message: impl Into<String>, details: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the `error` envelope field.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::Authentication(_) => "authentication_error",
            AppError::NotFound(_) => "not_found",
            AppError::Db(_) | AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Db(DbError::Sqlite(err))
    }
}

/// Shared error envelope: `{error, message?, details?}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 500 bodies stay generic; the cause goes to the log, not the caller.
        let (message, details) = match &self {
            AppError::Db(e) => {
                tracing::error!("database error: {e}");
                (Some("An internal error occurred".to_string()), None)
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e}");
                (Some("An internal error occurred".to_string()), None)
            }
            AppError::Validation { message, details } => (
                Some(message.clone()),
                (!details.is_empty()).then(|| details.clone()),
            ),
            other => (Some(other.to_string()), None),
        };

        let body = ErrorBody {
            error: self.error_code().to_string(),
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Authentication("no session".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("Deal".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::validation("x").error_code(), "validation_error");
        assert_eq!(
            AppError::NotFound("Deal".into()).error_code(),
            "not_found"
        );
        assert_eq!(
            AppError::Internal("x".into()).error_code(),
            "internal_error"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = AppError::NotFound("Deal".into());
        assert_eq!(err.to_string(), "Deal not found");
    }

    #[test]
    fn test_envelope_skips_empty_details() {
        let body = ErrorBody {
            error: "validation_error".into(),
            message: Some("bad input".into()),
            details: None,
        };
        let json = serde_json::to_string(&body).expect("serialize");
        assert!(!json.contains("details"));
    }
}
