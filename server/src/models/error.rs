use thiserror::Error;

/// Failure raised by entity construction, mutation, or persistence.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A field is missing, empty, or malformed.
    #[error("{0}")]
    InvalidArgument(String),

    /// A field is well formed but outside its allowed bound or length.
    #[error("{0}")]
    OutOfRange(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row failed validation while being turned back into an entity.
    /// The whole query is aborted rather than skipping the row.
    #[error("stored row is invalid: {0}")]
    InvalidRow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    Range,
    Storage,
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::InvalidArgument(_) => ErrorKind::Argument,
            ModelError::OutOfRange(_) => ErrorKind::Range,
            ModelError::Database(_) | ModelError::InvalidRow(_) => ErrorKind::Storage,
        }
    }

    /// Re-tags a validation failure found while hydrating a row.
    pub(crate) fn into_row_error(self) -> ModelError {
        match self {
            ModelError::InvalidArgument(msg) | ModelError::OutOfRange(msg) => {
                ModelError::InvalidRow(msg)
            }
            other => other,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, ModelError::Database(sqlx::Error::Database(db)) if db.is_unique_violation())
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, ModelError::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation())
    }
}
