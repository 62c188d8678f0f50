use crate::backend::StorageBackend;
use crate::error::StorageResult;
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

type DbPool = Pool<SqliteConnectionManager>;

/// SQLite хранилище для persistent ("local") области
pub struct SqliteBackend {
    pool: DbPool,
}

impl SqliteBackend {
    /// Открыть (или создать) базу с пулом соединений
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| crate::StorageError::Unavailable(e.to_string()))?;
            }
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;

        {
            let conn = pool.get()?;
            Self::init_schema(&conn)?;
        }

        info!("Opened sqlite storage at {}", path.display());
        Ok(Self { pool })
    }

    /// In-memory база. Каждое соединение SQLite `:memory:` видит свою базу,
    /// поэтому пул ограничен одним соединением.
    pub fn in_memory() -> StorageResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        {
            let conn = pool.get()?;
            Self::init_schema(&conn)?;
        }
        Ok(Self { pool })
    }

    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        debug!(key, bytes = value.len(), "sqlite set");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM kv_store", [])?;
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn usage_bytes(&self) -> StorageResult<usize> {
        let conn = self.pool.get()?;
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM kv_store",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.set("tasks", "[]").unwrap();
        backend.set("tasks", "[1]").unwrap();
        assert_eq!(backend.get("tasks").unwrap().as_deref(), Some("[1]"));
        assert_eq!(backend.keys().unwrap(), vec!["tasks".to_string()]);
        assert_eq!(backend.usage_bytes().unwrap(), "tasks".len() + "[1]".len());

        backend.remove("tasks").unwrap();
        assert!(backend.get("tasks").unwrap().is_none());
        assert_eq!(backend.usage_bytes().unwrap(), 0);
    }

    #[test]
    fn test_usage_counts_utf8_bytes() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.set("k", "задача").unwrap();
        assert_eq!(backend.usage_bytes().unwrap(), 1 + "задача".len());
    }
}
