use common::{ErrorSeverity, HasSeverity};
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage quota exceeded: {required} bytes required, quota is {quota} bytes")]
    QuotaExceeded { required: usize, quota: usize },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("validation failed for key \"{0}\"")]
    Validation(String),

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

impl HasSeverity for StorageError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            StorageError::Validation(_) => ErrorSeverity::Low,
            StorageError::QuotaExceeded { .. }
            | StorageError::Parse(_)
            | StorageError::Serialization(_) => ErrorSeverity::Medium,
            StorageError::Unavailable(_)
            | StorageError::Backend(_)
            | StorageError::Database(_)
            | StorageError::Pool(_) => ErrorSeverity::High,
        }
    }
}
