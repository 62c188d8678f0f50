use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Приоритет задачи
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// Основная структура задачи. Формат хранения: camelCase JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub done: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Restores a task from a stored record, tolerating partial data.
    ///
    /// Records without a string `id` or `text` are dropped. `done` follows
    /// truthiness, unknown priorities become medium, a missing or unreadable
    /// `createdAt` becomes `now` and a missing `updatedAt` falls back to
    /// `createdAt`.
    pub fn from_stored(record: &Value, now: DateTime<Utc>) -> Option<Task> {
        let id = record.get("id")?.as_str()?.to_string();
        let text = record.get("text")?.as_str()?.to_string();

        let done = record.get("done").map(is_truthy).unwrap_or(false);
        let priority = record
            .get("priority")
            .and_then(Value::as_str)
            .and_then(|p| p.parse().ok())
            .unwrap_or_default();
        let created_at = timestamp(record, "createdAt").unwrap_or(now);
        let updated_at = timestamp(record, "updatedAt").unwrap_or(created_at);

        Some(Task {
            id,
            text,
            done,
            priority,
            created_at,
            updated_at,
        })
    }
}

fn timestamp(record: &Value, field: &str) -> Option<DateTime<Utc>> {
    let raw = record.get(field)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
    Priority,
    Text,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created" | "created_at" => Ok(SortBy::CreatedAt),
            "updatedAt" | "updated" | "updated_at" => Ok(SortBy::UpdatedAt),
            "priority" => Ok(SortBy::Priority),
            "text" => Ok(SortBy::Text),
            _ => Err(format!("Unknown sort field: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => !task.done,
            TaskFilter::Completed => task.done,
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TaskFilter::All),
            "active" => Ok(TaskFilter::Active),
            "completed" | "done" => Ok(TaskFilter::Completed),
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// Настройки отображения списка
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSettings {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub filter_by: TaskFilter,
}

/// Частичное обновление настроек: `None` оставляет поле как есть
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSettingsUpdate {
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub filter_by: Option<TaskFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub done: Option<bool>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.priority.is_none() && self.done.is_none()
    }
}

/// Статистика по задачам
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    /// Проценты, два знака после запятой
    pub completion_rate: f64,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.done).count();
        let completion_rate = if total == 0 {
            0.0
        } else {
            (completed as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        };
        Self {
            total,
            active: total - completed,
            completed,
            completion_rate,
        }
    }
}

/// Состояние модуля задач
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    Idle,
    Loading,
    Ready,
    Saving,
    Error,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Idle => write!(f, "idle"),
            ModuleState::Loading => write!(f, "loading"),
            ModuleState::Ready => write!(f, "ready"),
            ModuleState::Saving => write!(f, "saving"),
            ModuleState::Error => write!(f, "error"),
        }
    }
}

/// События в системе задач
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskEvent {
    Created { task: Task },
    Updated { task: Task },
    Removed { task_id: String },
    Toggled { task_id: String, done: bool },
    ClearedCompleted { removed: usize },
}
