//! Unified error vocabulary for entity access.
//!
//! Every store failure is normalized into one of a handful of outcomes
//! before it reaches a caller:
//! - `NotFound` when a required row is missing
//! - `Conflict` when a uniqueness constraint is violated
//! - `Validation` when the caller's input cannot be applied
//! - `Persistence` for any other store failure
//!
//! The HTTP mapping lives here as well so request handlers can return
//! `AppResult` directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    // Resource errors
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    // Store errors that are neither missing rows nor uniqueness violations
    #[error("Persistence error: {0}")]
    Persistence(String),

    // Internal
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Conflict(msg) | AppError::Validation(msg) => {
                msg.clone()
            }
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {}", msg);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
        }
    }

    /// Whether this outcome came from the store itself rather than from a
    /// missing row, a constraint or caller input.
    pub fn is_persistence(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Store Error Conversion
// =============================================================================

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        use sea_orm::{DbErr, SqlErr};

        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return AppError::Conflict(format!("Unique constraint violated: {}", detail));
        }

        match err {
            DbErr::RecordNotFound(msg) => AppError::NotFound(msg),
            DbErr::RecordNotUpdated => AppError::NotFound("Record no longer exists".to_string()),
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization failed: {}", err))
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, detail: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, detail: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(detail.into()))
    }
}

/// Convenience constructors
impl AppError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        AppError::NotFound(detail.into())
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        AppError::Conflict(detail.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        AppError::Persistence(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_outcome() {
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::persistence("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn persistence_details_are_hidden_from_clients() {
        let err = AppError::persistence("relation \"users\" does not exist");
        assert_eq!(err.user_message(), "A database error occurred");
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::conflict("users with email a@b.c already exists");
        assert_eq!(err.user_message(), "users with email a@b.c already exists");
    }

    #[test]
    fn missing_option_becomes_not_found() {
        let value: Option<u8> = None;
        assert_eq!(
            value.ok_or_not_found("users not found with ID 7"),
            Err(AppError::NotFound("users not found with ID 7".to_string()))
        );
    }

    #[cfg(feature = "database")]
    #[test]
    fn store_errors_are_classified() {
        use sea_orm::DbErr;

        assert!(matches!(
            AppError::from(DbErr::RecordNotFound("users".to_string())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(DbErr::RecordNotUpdated),
            AppError::NotFound(_)
        ));
        assert!(AppError::from(DbErr::Custom("boom".to_string())).is_persistence());
    }
}
