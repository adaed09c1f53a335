//! Core error types

use nervelle_db::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(DbError),

    #[error("Auth error: {0}")]
    Auth(#[from] nervelle_auth::AuthError),

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(msg) => CoreError::DuplicateUsername(msg),
            other => CoreError::Database(other),
        }
    }
}
