//! SQLite-backed storage areas
//!
//! All areas share one database file and one connection. Items are stored as
//! serialized JSON text keyed by `(area, key)`.

use super::{Items, StorageArea, StorageAreaKind, StorageQuota};
use crate::error::{ProfileError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS items (
    area TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (area, key)
)";

/// Shared handle to the storage database.
#[derive(Clone)]
pub struct SqliteDatabase(Arc<Mutex<Connection>>);

impl SqliteDatabase {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("opened storage database {:?} (journal_mode={})", path, mode);
        Self::initialize(conn)
    }

    /// Database that lives only as long as the handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        log::debug!("storage schema ready");
        Ok(SqliteDatabase(Arc::new(Mutex::new(conn))))
    }

    /// Handle to one storage area of this database.
    pub fn area(&self, kind: StorageAreaKind, quota: StorageQuota) -> SqliteStorage {
        SqliteStorage {
            db: self.clone(),
            kind,
            quota,
        }
    }
}

/// One storage area inside a [`SqliteDatabase`].
#[derive(Clone)]
pub struct SqliteStorage {
    db: SqliteDatabase,
    kind: StorageAreaKind,
    quota: StorageQuota,
}

fn decode(key: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| {
        ProfileError::Storage(format!("Corrupt value stored under '{}': {}", key, e))
    })
}

#[async_trait]
impl StorageArea for SqliteStorage {
    async fn get(&self, keys: &[String]) -> Result<Items> {
        let conn = self.db.0.lock().await;
        let mut stmt = conn.prepare("SELECT value FROM items WHERE area = ?1 AND key = ?2")?;

        let mut items = Items::new();
        for key in keys {
            let mut rows = stmt.query(params![self.kind.as_str(), key])?;
            if let Some(row) = rows.next()? {
                let raw: String = row.get(0)?;
                items.insert(key.clone(), decode(key, &raw)?);
            }
        }
        Ok(items)
    }

    async fn get_all(&self) -> Result<Items> {
        let conn = self.db.0.lock().await;
        let mut stmt = conn.prepare("SELECT key, value FROM items WHERE area = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.kind.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut items = Items::new();
        for row in rows {
            let (key, raw) = row?;
            let value = decode(&key, &raw)?;
            items.insert(key, value);
        }
        Ok(items)
    }

    async fn set(&self, batch: Items) -> Result<()> {
        let mut conn = self.db.0.lock().await;
        let transaction = conn.transaction()?;

        let sizes = {
            let mut stmt = transaction.prepare(
                "SELECT key, length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))
                 FROM items WHERE area = ?1",
            )?;
            let rows = stmt.query_map(params![self.kind.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut sizes = HashMap::new();
            for row in rows {
                let (key, size) = row?;
                sizes.insert(key, size.max(0) as usize);
            }
            sizes
        };
        self.quota.check(sizes, &batch)?;

        for (key, value) in &batch {
            transaction.execute(
                "INSERT OR REPLACE INTO items (area, key, value) VALUES (?1, ?2, ?3)",
                params![self.kind.as_str(), key, value.to_string()],
            )?;
        }

        transaction.commit()?;
        log::trace!("wrote {} item(s) to {} area", batch.len(), self.kind);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut conn = self.db.0.lock().await;
        let transaction = conn.transaction()?;

        for key in keys {
            transaction.execute(
                "DELETE FROM items WHERE area = ?1 AND key = ?2",
                params![self.kind.as_str(), key],
            )?;
        }

        transaction.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteDatabase;
    use crate::error::ProfileError;
    use crate::storage::{StorageArea, StorageAreaKind, StorageQuota};
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn areas_are_isolated() {
        let db = SqliteDatabase::open_in_memory().expect("db");
        let sync = db.area(StorageAreaKind::Sync, StorageQuota::sync());
        let local = db.area(StorageAreaKind::Local, StorageQuota::unlimited());

        sync.set_one("k", json!("sync")).await.expect("set sync");
        local.set_one("k", json!("local")).await.expect("set local");

        assert_eq!(sync.get_one("k").await.expect("get"), Some(json!("sync")));
        assert_eq!(local.get_one("k").await.expect("get"), Some(json!("local")));

        local.remove(&["k".to_string()]).await.expect("remove");
        assert!(local.get_one("k").await.expect("get").is_none());
        assert!(sync.get_one("k").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("storage.sqlite3");
        {
            let db = SqliteDatabase::open(&path).expect("open");
            let sync = db.area(StorageAreaKind::Sync, StorageQuota::sync());
            sync.set_one("profile_list", json!(["a", "b"]))
                .await
                .expect("set");
        }

        let db = SqliteDatabase::open(&path).expect("reopen");
        let sync = db.area(StorageAreaKind::Sync, StorageQuota::sync());
        let all = sync.get_all().await.expect("get_all");
        assert_eq!(all.get("profile_list"), Some(&json!(["a", "b"])));
    }

    #[tokio::test]
    async fn quota_violation_rolls_back_batch() {
        let db = SqliteDatabase::open_in_memory().expect("db");
        let sync = db.area(
            StorageAreaKind::Sync,
            StorageQuota {
                bytes_per_item: Some(64),
                total_bytes: Some(80),
                max_items: None,
            },
        );
        sync.set_one("first", json!("x".repeat(40)))
            .await
            .expect("first write fits");

        let err = sync
            .set_one("second", json!("y".repeat(40)))
            .await
            .expect_err("total exceeded");
        assert!(matches!(err, ProfileError::QuotaExceeded { .. }));
        assert!(sync.get_one("second").await.expect("get").is_none());
    }
}
