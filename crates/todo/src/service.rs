use crate::error::{TaskError, TaskResult};
use crate::sort::sort_tasks;
use crate::types::*;
use crate::validation::{generate_task_id, validate_task};
use chrono::Utc;
use common::topics::TOPIC_TASKS;
use common::{EventBus, EventEnvelope, HasSeverity, OperationTimer};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{StorageArea, StoreOptions, VersionedStore};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

pub const TASKS_KEY: &str = "tasks";

/// Список задач поверх versioned storage.
///
/// Все мутации сначала пишутся в хранилище и только после успешной записи
/// попадают в память и публикуются как [`TaskEvent`].
pub struct TaskService {
    store: VersionedStore<Vec<Value>>,
    tasks: RwLock<Vec<Task>>,
    settings: RwLock<TaskSettings>,
    error: Arc<RwLock<Option<String>>>,
    loading: AtomicBool,
    saving: AtomicBool,
    initialized: AtomicBool,
    events: EventBus<TaskEvent>,
}

impl TaskService {
    /// Создать сервис со схемой версии `1.0` и загрузить задачи
    pub fn new(area: Arc<StorageArea>) -> Self {
        Self::with_options(area, "1.0", EventBus::default())
    }

    pub fn with_options(
        area: Arc<StorageArea>,
        schema_version: &str,
        events: EventBus<TaskEvent>,
    ) -> Self {
        let error = Arc::new(RwLock::new(None));
        let sink = error.clone();
        let options = StoreOptions::default()
            .with_version(schema_version)
            .with_error_handler(move |e| *sink.write() = Some(e.to_string()));

        let store = VersionedStore::new(area, TASKS_KEY, Vec::new(), options);
        let service = Self {
            store,
            tasks: RwLock::new(Vec::new()),
            settings: RwLock::new(TaskSettings::default()),
            error,
            loading: AtomicBool::new(false),
            saving: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            events,
        };
        service.initialize();
        service
    }

    /// (Пере)загрузить задачи из хранилища, отбросив неполные записи
    #[instrument(skip(self))]
    pub fn initialize(&self) {
        self.loading.store(true, Ordering::SeqCst);
        *self.error.write() = None;

        let raw = self.store.load();
        let now = Utc::now();
        let loaded: Vec<Task> = raw
            .iter()
            .filter_map(|record| Task::from_stored(record, now))
            .collect();

        if loaded.len() != raw.len() {
            debug!(
                "Dropped {} malformed task records",
                raw.len() - loaded.len()
            );
        }
        info!("Loaded {} tasks", loaded.len());

        *self.tasks.write() = loaded;
        self.initialized.store(true, Ordering::SeqCst);
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Добавить задачу в начало списка
    #[instrument(skip(self))]
    pub async fn add_task(&self, text: &str, priority: Priority) -> TaskResult<Task> {
        if let Err(errors) = validate_task(text, Some(priority.as_str())) {
            return Err(self.fail(errors.into()));
        }

        let now = Utc::now();
        let task = Task {
            id: generate_task_id(),
            text: text.trim().to_string(),
            done: false,
            priority,
            created_at: now,
            updated_at: now,
        };

        let created = task.clone();
        self.mutate(move |tasks| {
            tasks.insert(0, task);
            true
        })?;

        debug!("Created task: {} ({})", created.text, created.id);
        self.emit(TaskEvent::Created {
            task: created.clone(),
        })
        .await;
        Ok(created)
    }

    /// `Ok(false)` если задачи нет
    #[instrument(skip(self))]
    pub async fn update_task(&self, id: &str, update: TaskUpdate) -> TaskResult<bool> {
        if !self.contains(id) {
            return Ok(false);
        }

        if let Some(text) = &update.text {
            if let Err(errors) = validate_task(text, None) {
                return Err(self.fail(errors.into()));
            }
        }

        let mut updated = None;
        let changed = self.mutate(|tasks| {
            let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
                return false;
            };
            if let Some(text) = &update.text {
                task.text = text.trim().to_string();
            }
            if let Some(priority) = update.priority {
                task.priority = priority;
            }
            if let Some(done) = update.done {
                task.done = done;
            }
            task.updated_at = Utc::now();
            updated = Some(task.clone());
            true
        })?;

        if let Some(task) = updated {
            self.emit(TaskEvent::Updated { task }).await;
        }
        Ok(changed)
    }

    #[instrument(skip(self))]
    pub async fn remove_task(&self, id: &str) -> TaskResult<bool> {
        let removed = self.mutate(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            tasks.len() != before
        })?;

        if removed {
            self.emit(TaskEvent::Removed {
                task_id: id.to_string(),
            })
            .await;
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn toggle_task(&self, id: &str) -> TaskResult<bool> {
        let mut done = None;
        let toggled = self.mutate(|tasks| {
            let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
                return false;
            };
            task.done = !task.done;
            task.updated_at = Utc::now();
            done = Some(task.done);
            true
        })?;

        if let Some(done) = done {
            self.emit(TaskEvent::Toggled {
                task_id: id.to_string(),
                done,
            })
            .await;
        }
        Ok(toggled)
    }

    /// Удалить выполненные задачи, вернуть их количество
    #[instrument(skip(self))]
    pub async fn clear_completed(&self) -> TaskResult<usize> {
        let mut removed = 0;
        self.mutate(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| !t.done);
            removed = before - tasks.len();
            removed > 0
        })?;

        if removed > 0 {
            self.emit(TaskEvent::ClearedCompleted { removed }).await;
        }
        Ok(removed)
    }

    pub fn update_settings(&self, update: TaskSettingsUpdate) -> TaskSettings {
        let mut settings = self.settings.write();
        if let Some(sort_by) = update.sort_by {
            settings.sort_by = sort_by;
        }
        if let Some(sort_order) = update.sort_order {
            settings.sort_order = sort_order;
        }
        if let Some(filter_by) = update.filter_by {
            settings.filter_by = filter_by;
        }
        *settings
    }

    pub fn settings(&self) -> TaskSettings {
        *self.settings.read()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().iter().find(|t| t.id == id).cloned()
    }

    pub fn active_tasks(&self) -> Vec<Task> {
        self.filtered(TaskFilter::Active)
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        self.filtered(TaskFilter::Completed)
    }

    /// Все задачи в порядке текущих настроек
    pub fn sorted_tasks(&self) -> Vec<Task> {
        let settings = self.settings();
        sort_tasks(&self.tasks.read(), settings.sort_by, settings.sort_order)
    }

    /// Задачи после фильтра и сортировки из настроек
    pub fn visible_tasks(&self) -> Vec<Task> {
        let settings = self.settings();
        let filtered = self.filtered(settings.filter_by);
        sort_tasks(&filtered, settings.sort_by, settings.sort_order)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks.read())
    }

    pub fn state(&self) -> ModuleState {
        if self.error.read().is_some() {
            ModuleState::Error
        } else if self.loading.load(Ordering::SeqCst) {
            ModuleState::Loading
        } else if self.saving.load(Ordering::SeqCst) {
            ModuleState::Saving
        } else if self.initialized.load(Ordering::SeqCst) {
            ModuleState::Ready
        } else {
            ModuleState::Idle
        }
    }

    pub fn error(&self) -> Option<String> {
        self.error.read().clone()
    }

    pub fn clear_error(&self) {
        *self.error.write() = None;
    }

    pub fn is_storage_supported(&self) -> bool {
        self.store.is_supported()
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<EventEnvelope<TaskEvent>> {
        self.events.subscribe(TOPIC_TASKS).await
    }

    fn contains(&self, id: &str) -> bool {
        self.tasks.read().iter().any(|t| t.id == id)
    }

    fn filtered(&self, filter: TaskFilter) -> Vec<Task> {
        self.tasks
            .read()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// Применить `change` к копии списка и сохранить её. Если `change`
    /// вернул `false`, ничего не пишется.
    fn mutate<F>(&self, change: F) -> TaskResult<bool>
    where
        F: FnOnce(&mut Vec<Task>) -> bool,
    {
        let mut tasks = self.tasks.write();
        let mut next = tasks.clone();
        if !change(&mut next) {
            return Ok(false);
        }

        let mut timer = OperationTimer::new("tasks_save");
        timer.add_field("count", next.len());

        self.saving.store(true, Ordering::SeqCst);
        let result = self.persist(&next);
        self.saving.store(false, Ordering::SeqCst);
        timer.finish_with_result(&result);

        match result {
            Ok(()) => {
                *tasks = next;
                *self.error.write() = None;
                Ok(true)
            }
            // Сообщение уже записано обработчиком ошибок хранилища
            Err(e @ TaskError::Storage(_)) => Err(e),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn persist(&self, tasks: &[Task]) -> TaskResult<()> {
        let records = tasks
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.store.save(records)?;
        Ok(())
    }

    fn fail(&self, err: TaskError) -> TaskError {
        err.log();
        *self.error.write() = Some(err.to_string());
        err
    }

    async fn emit(&self, event: TaskEvent) {
        self.events.publish(TOPIC_TASKS, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TaskService {
        TaskService::new(Arc::new(StorageArea::session()))
    }

    #[tokio::test]
    async fn test_add_inserts_at_front_trimmed() {
        let service = service();
        service.add_task("first", Priority::Low).await.unwrap();
        let second = service.add_task("  second  ", Priority::High).await.unwrap();

        assert_eq!(second.text, "second");
        assert!(second.id.starts_with("task_"));
        let texts: Vec<_> = service.tasks().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, ["second", "first"]);
        assert_eq!(service.state(), ModuleState::Ready);
    }

    #[tokio::test]
    async fn test_invalid_text_sets_error_state() {
        let service = service();
        let err = service.add_task("   ", Priority::Medium).await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert_eq!(service.error().as_deref(), Some("task text must not be empty"));
        assert_eq!(service.state(), ModuleState::Error);
        assert!(service.tasks().is_empty());

        service.add_task("fine", Priority::Medium).await.unwrap();
        assert_eq!(service.state(), ModuleState::Ready);
    }

    #[test]
    fn test_settings_merge() {
        let service = service();
        assert_eq!(service.settings(), TaskSettings::default());

        let merged = service.update_settings(TaskSettingsUpdate {
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        });
        assert_eq!(merged.sort_by, SortBy::CreatedAt);
        assert_eq!(merged.sort_order, SortOrder::Asc);
        assert_eq!(merged.filter_by, TaskFilter::All);
    }
}
