use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

/// Error types for the domain operations
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Input rejected before anything was written
    #[error("{field}: {message}")]
    Validation {
        /// Name of the offending request field
        field: &'static str,
        /// Human readable reason
        message: String,
    },

    /// A unique row (relation, name, email...) already exists
    #[error("{0}")]
    Duplicate(String),

    /// A referenced row does not exist
    #[error("{0}")]
    NotFound(String),

    /// The caller may not modify this row
    #[error("{0}")]
    Forbidden(String),
}

impl ComputeError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ComputeError::Validation {
            field,
            message: message.into(),
        }
    }
}

// Unique violations raised by the store are duplicates, not server faults
impl From<DbErr> for ComputeError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                ComputeError::Duplicate(format!("Unique constraint violated: {}", detail))
            }
            _ => {
                error!(?err, "Database error");
                ComputeError::Database(err)
            }
        }
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
