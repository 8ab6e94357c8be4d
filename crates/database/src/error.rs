use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("An error occurred during JSON serialization/deserialization: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),
}

impl DbError {
    pub fn not_found(what: &str) -> Self {
        DbError::NotFound(what.to_string())
    }
}
