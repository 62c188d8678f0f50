//! Список задач: CRUD, сортировка, фильтры и статистика поверх
//! [`storage::VersionedStore`].

pub mod error;
pub mod service;
pub mod sort;
pub mod types;
pub mod validation;

pub use error::{TaskError, TaskResult};
pub use service::{TaskService, TASKS_KEY};
pub use sort::sort_tasks;
pub use types::*;
pub use validation::{generate_task_id, validate_task, MAX_TASK_TEXT_CHARS};

use std::path::Path;
use std::sync::Arc;
use storage::{StorageArea, StorageResult};

/// Открыть сервис задач над sqlite файлом
///
/// # Пример
/// ```no_run
/// use todo::{open_service, Priority};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let service = open_service("deskpad.db", 4)?;
///     service.add_task("Write release notes", Priority::High).await?;
///     println!("{:?}", service.stats());
///     Ok(())
/// }
/// ```
pub fn open_service<P: AsRef<Path>>(db_path: P, pool_size: u32) -> StorageResult<TaskService> {
    let area = StorageArea::open_local(db_path, pool_size)?;
    Ok(TaskService::new(Arc::new(area)))
}
