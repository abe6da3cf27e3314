use thiserror::Error;

#[derive(Debug, Error)]
pub enum AxoError {
    #[error("No {kind} with id {id}")]
    NotFound { kind: &'static str, id: i64 },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type AxoResult<T> = Result<T, AxoError>;

impl AxoError {
    pub fn not_found(kind: &'static str, id: i64) -> Self {
        AxoError::NotFound { kind, id }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        AxoError::InvalidArgument(reason.into())
    }
}
