//! SQLite 键值存储
//!
//! 单表 `kv_store(key, value, updated_at)`，启用 WAL 模式。

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::storage::{KeyValueStore, StorageError, StorageResult};

const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// 基于 SQLite 的键值存储
pub struct SqliteKeyValueStore {
    connection: Mutex<Connection>,
    db_path: String,
}

impl SqliteKeyValueStore {
    /// 打开（或创建）数据库文件
    ///
    /// 父目录不存在时自动创建。
    ///
    /// # Example
    /// ```ignore
    /// let store = SqliteKeyValueStore::open("./data/knowledge.db")?;
    /// ```
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }

        let connection = Connection::open(path)?;

        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        connection.execute_batch(KV_SCHEMA)?;

        Ok(Self {
            connection: Mutex::new(connection),
            db_path: path.to_string_lossy().to_string(),
        })
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(KV_SCHEMA)?;

        Ok(Self {
            connection: Mutex::new(connection),
            db_path: ":memory:".to_string(),
        })
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn get_connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.get_connection()?;

        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;

        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let conn = self.get_connection()?;
        let affected = conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_path() {
        let store = SqliteKeyValueStore::in_memory().expect("Failed to create in-memory store");
        assert_eq!(store.db_path(), ":memory:");
    }

    #[test]
    fn test_kv_operations() {
        let store = SqliteKeyValueStore::in_memory().expect("Failed to create in-memory store");

        store.set("slot", "{\"a\":1}").expect("Failed to set value");
        assert_eq!(store.get("slot").unwrap(), Some("{\"a\":1}".to_string()));

        // 覆盖写入
        store.set("slot", "{\"a\":2}").expect("Failed to overwrite value");
        assert_eq!(store.get("slot").unwrap(), Some("{\"a\":2}".to_string()));

        assert!(store.remove("slot").unwrap());
        assert_eq!(store.get("slot").unwrap(), None);

        // 删除不存在的键
        assert!(!store.remove("slot").unwrap());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("knowledge.db");

        {
            let store = SqliteKeyValueStore::open(&path).unwrap();
            store.set("slot", "persisted").unwrap();
        }

        let reopened = SqliteKeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get("slot").unwrap(), Some("persisted".to_string()));
    }
}
