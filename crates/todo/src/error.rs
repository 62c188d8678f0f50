use common::{ErrorSeverity, HasSeverity, ValidationErrors};
use storage::StorageError;
use thiserror::Error;

pub type TaskResult<T> = Result<T, TaskError>;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to encode task: {0}")]
    Encode(#[from] serde_json::Error),
}

impl HasSeverity for TaskError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            TaskError::Validation(_) => ErrorSeverity::Low,
            TaskError::Storage(e) => e.severity(),
            TaskError::Encode(_) => ErrorSeverity::High,
        }
    }
}
