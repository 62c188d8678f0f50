use common::{ErrorSeverity, HasSeverity};
use thiserror::Error;

pub type NetworkResult<T> = Result<T, NetworkError>;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("invalid probe url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("probe request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("probe timed out after {0} ms")]
    Timeout(u64),
}

impl HasSeverity for NetworkError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            NetworkError::InvalidUrl(_) => ErrorSeverity::Medium,
            NetworkError::Http(_) | NetworkError::Timeout(_) => ErrorSeverity::Low,
        }
    }
}
