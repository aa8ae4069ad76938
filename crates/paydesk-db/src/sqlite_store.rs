use paydesk_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::kv_store::KeyValueStore;

/// Durable key-value store in a SQLite file, namespaced by origin.
///
/// Several origins may share one database file; each only sees its own keys.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
    origin: String,
}

impl SqliteKeyValueStore {
    pub fn open(db_path: &Path, origin: impl Into<String>) -> Result<Self> {
        info!("opening key-value store at {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!(
                        "failed to create storage directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| Error::Storage(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Error::Storage(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
            origin: origin.into(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory(origin: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Storage(format!("failed to open in-memory database: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
            origin: origin.into(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.lock()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv_entries (
                    origin TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (origin, key)
                );",
            )
            .map_err(|e| Error::Storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Keys currently stored for this origin, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT key FROM kv_entries WHERE origin = ?1 ORDER BY key")
            .map_err(|e| Error::Storage(format!("failed to prepare key query: {e}")))?;

        let rows = stmt
            .query_map(params![self.origin], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Storage(format!("failed to list keys: {e}")))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(|e| Error::Storage(format!("failed to read key row: {e}")))?);
        }
        Ok(keys)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.lock()
            .query_row(
                "SELECT value FROM kv_entries WHERE origin = ?1 AND key = ?2",
                params![self.origin, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Storage(format!("failed to read '{key}': {e}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()
            .execute(
                "INSERT INTO kv_entries (origin, key, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(origin, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = datetime('now')",
                params![self.origin, key, value],
            )
            .map_err(|e| Error::Storage(format!("failed to write '{key}': {e}")))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = self
            .lock()
            .execute(
                "DELETE FROM kv_entries WHERE origin = ?1 AND key = ?2",
                params![self.origin, key],
            )
            .map_err(|e| Error::Storage(format!("failed to remove '{key}': {e}")))?;
        if removed > 0 {
            debug!("removed '{key}' from origin {}", self.origin);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_creates_kv_table() {
        let store = SqliteKeyValueStore::in_memory("https://dash.local").unwrap();
        let exists: i64 = store
            .lock()
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='kv_entries'",
                [],
                |row| row.get(0),
            )
            .expect("failed to query sqlite_master");
        assert_eq!(exists, 1);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = SqliteKeyValueStore::in_memory("o").unwrap();
        store.set("currentRole", "admin").unwrap();
        store.set("currentRole", "merchant").unwrap();
        assert_eq!(
            store.get("currentRole").unwrap(),
            Some("merchant".to_string())
        );
        assert_eq!(store.keys().unwrap(), vec!["currentRole".to_string()]);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = SqliteKeyValueStore::in_memory("o").unwrap();
        store.set("token", "legacy").unwrap();
        store.remove("token").unwrap();
        store.remove("token").unwrap();
        assert_eq!(store.get("token").unwrap(), None);
    }
}
