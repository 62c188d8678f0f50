use crate::types::Priority;
use chrono::Utc;
use common::ValidationErrors;
use uuid::Uuid;

pub const MAX_TASK_TEXT_CHARS: usize = 200;

/// Checks task text and, when given, a priority name.
///
/// Length is measured in characters of the trimmed text.
pub fn validate_task(text: &str, priority: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let trimmed = text.trim();
    if trimmed.is_empty() {
        errors.push("task text must not be empty");
    } else if trimmed.chars().count() > MAX_TASK_TEXT_CHARS {
        errors.push(format!(
            "task text must be at most {} characters",
            MAX_TASK_TEXT_CHARS
        ));
    }

    if let Some(priority) = priority {
        if priority.parse::<Priority>().is_err() {
            errors.push("invalid priority");
        }
    }

    errors.into_result()
}

/// `task_<unix-ms>_<9 lowercase alnum>`
pub fn generate_task_id() -> String {
    generate_id("task")
}

pub(crate) fn generate_id(prefix: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), suffix)
}
