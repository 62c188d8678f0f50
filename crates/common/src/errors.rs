use std::fmt;
use thiserror::Error;

/// Набор сообщений валидации, накопленных за одну проверку.
///
/// `Display` склеивает сообщения через `", "`, так же их видит пользователь.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", .messages.join(", "))]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn contains(&self, message: &str) -> bool {
        self.messages.iter().any(|m| m == message)
    }

    /// `Ok(())` если ошибок нет, иначе сам набор как ошибка
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Vec<String>> for ValidationErrors {
    fn from(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

/// Error severity для alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "low"),
            ErrorSeverity::Medium => write!(f, "medium"),
            ErrorSeverity::High => write!(f, "high"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Ошибки доменных крейтов сообщают свою критичность, `log` по ней выбирает
/// уровень tracing.
pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;

    fn log(&self)
    where
        Self: fmt::Display,
    {
        match self.severity() {
            ErrorSeverity::Low => tracing::debug!(error = %self, "operation rejected"),
            ErrorSeverity::Medium => tracing::warn!(error = %self, "operation failed"),
            ErrorSeverity::High | ErrorSeverity::Critical => {
                tracing::error!(error = %self, severity = %self.severity(), "operation failed")
            }
        }
    }
}

impl HasSeverity for ValidationErrors {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Low
    }
}
