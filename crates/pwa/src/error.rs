use common::{ErrorSeverity, HasSeverity};
use thiserror::Error;

pub type PwaResult<T> = Result<T, WorkerError>;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("service worker is not supported")]
    Unsupported,

    #[error("no active service worker controller")]
    NoController,

    #[error("service worker did not answer within {0} ms")]
    Timeout(u64),

    #[error("message channel closed before a reply arrived")]
    ChannelClosed,

    #[error("message cancelled by cleanup")]
    Cancelled,

    #[error("registration failed: {0}")]
    Registration(String),

    #[error("install prompt failed: {0}")]
    Prompt(String),

    #[error("notification permission request failed: {0}")]
    Permission(String),

    #[error("cache operation failed: {0}")]
    Cache(String),

    #[error("invalid cache strategy: {0}")]
    InvalidStrategy(String),

    #[error("unexpected reply: {0}")]
    Reply(#[from] serde_json::Error),
}

impl HasSeverity for WorkerError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            WorkerError::Unsupported | WorkerError::NoController | WorkerError::Cancelled => {
                ErrorSeverity::Low
            }
            WorkerError::Timeout(_)
            | WorkerError::ChannelClosed
            | WorkerError::Prompt(_)
            | WorkerError::Permission(_)
            | WorkerError::InvalidStrategy(_)
            | WorkerError::Reply(_) => ErrorSeverity::Medium,
            WorkerError::Registration(_) | WorkerError::Cache(_) => ErrorSeverity::High,
        }
    }
}
