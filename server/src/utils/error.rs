use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ModelError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    /// A stored row no longer passes entity validation.
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::StorageError(_) => "STORAGE_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::StorageError(msg) => {
                error!(message = %msg, "Stored row failed validation");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        if err.is_unique_violation() {
            return AppError::Conflict("record already exists".to_string());
        }
        if err.is_foreign_key_violation() {
            return AppError::ValidationError("referenced record does not exist".to_string());
        }
        match err {
            ModelError::InvalidArgument(msg) | ModelError::OutOfRange(msg) => {
                AppError::ValidationError(msg)
            }
            ModelError::Database(e) => AppError::DatabaseError(e),
            ModelError::InvalidRow(msg) => AppError::StorageError(msg),
        }
    }
}

impl AppError {
    /// Maps a failed delete. A foreign key violation here means other rows
    /// still point at the one being removed.
    pub fn from_delete(err: ModelError) -> Self {
        if err.is_foreign_key_violation() {
            return AppError::Conflict("record is still referenced".to_string());
        }
        AppError::from(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::DatabaseError(_) | AppError::StorageError(_) => {
                "A database error occurred".to_string()
            }
        };

        error_response(code, public_message, None, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct ForeignKeyError;

    impl fmt::Display for ForeignKeyError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("violates foreign key constraint")
        }
    }

    impl StdError for ForeignKeyError {}

    impl sqlx::error::DatabaseError for ForeignKeyError {
        fn message(&self) -> &str {
            "violates foreign key constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23503"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::ForeignKeyViolation
        }
    }

    fn foreign_key_violation() -> ModelError {
        ModelError::Database(sqlx::Error::Database(Box::new(ForeignKeyError)))
    }

    #[test]
    fn test_model_errors_map_to_statuses() {
        let err = AppError::from(ModelError::OutOfRange("event name is too long".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Validation error: event name is too long");

        let err = AppError::from(ModelError::InvalidArgument("invalid uuid".into()));
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = AppError::from(ModelError::InvalidRow("bad".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::from(ModelError::Database(sqlx::Error::RowNotFound));
        assert_eq!(err.code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_every_variant_has_a_status() {
        let errors = [
            AppError::ValidationError("x".into()),
            AppError::AuthError("x".into()),
            AppError::Forbidden("x".into()),
            AppError::NotFound("x".into()),
            AppError::Conflict("x".into()),
            AppError::StorageError("x".into()),
        ];
        for err in errors {
            assert!(err.status_code().is_client_error() || err.status_code().is_server_error());
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = AppError::StorageError("row 7 has a 900 char name".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_foreign_key_violation_on_write_is_a_bad_reference() {
        let err = AppError::from(foreign_key_violation());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Validation error: referenced record does not exist"
        );
    }

    #[test]
    fn test_foreign_key_violation_on_delete_is_a_conflict() {
        let err = AppError::from_delete(foreign_key_violation());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Conflict: record is still referenced");

        let err = AppError::from_delete(ModelError::Database(sqlx::Error::RowNotFound));
        assert_eq!(err.code(), "DATABASE_ERROR");
    }
}
