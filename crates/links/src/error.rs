use common::{ErrorSeverity, HasSeverity, ValidationErrors};
use storage::StorageError;
use thiserror::Error;

pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("url already exists")]
    DuplicateUrl,

    #[error("link not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl HasSeverity for LinkError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            LinkError::Validation(_) | LinkError::DuplicateUrl | LinkError::NotFound(_) => {
                ErrorSeverity::Low
            }
            LinkError::Storage(e) => e.severity(),
        }
    }
}
