//! In-memory storage area

use super::{item_size, Items, StorageArea, StorageQuota};
use crate::error::{ProfileError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Storage area kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, Value>>,
    quota: Option<StorageQuota>,
}

impl MemoryStorage {
    /// Unlimited area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Area enforcing the given quota on every write.
    pub fn with_quota(quota: StorageQuota) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            quota: Some(quota),
        }
    }

    /// Area pre-filled with items, bypassing the quota.
    pub fn with_items(items: Items) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
            quota: None,
        }
    }

    /// Snapshot of every stored item.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.lock().map(|items| items.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.items
            .lock()
            .map_err(|_| ProfileError::Storage("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl StorageArea for MemoryStorage {
    async fn get(&self, keys: &[String]) -> Result<Items> {
        let items = self.lock()?;
        Ok(keys
            .iter()
            .filter_map(|key| items.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn get_all(&self) -> Result<Items> {
        let items = self.lock()?;
        Ok(items
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn set(&self, batch: Items) -> Result<()> {
        let mut items = self.lock()?;
        if let Some(quota) = &self.quota {
            let sizes = items
                .iter()
                .map(|(key, value)| (key.clone(), item_size(key, value)))
                .collect();
            quota.check(sizes, &batch)?;
        }
        items.extend(batch);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut items = self.lock()?;
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStorage;
    use crate::error::ProfileError;
    use crate::storage::{Items, StorageArea, StorageQuota};
    use serde_json::json;

    #[tokio::test]
    async fn get_skips_missing_keys() {
        let storage = MemoryStorage::new();
        storage.set_one("a", json!(1)).await.expect("set");

        let items = storage
            .get(&["a".to_string(), "b".to_string()])
            .await
            .expect("get");
        assert_eq!(items.len(), 1);
        assert_eq!(items.get("a"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn rejected_batch_writes_nothing() {
        let storage = MemoryStorage::with_quota(StorageQuota {
            bytes_per_item: Some(16),
            total_bytes: None,
            max_items: None,
        });
        let mut batch = Items::new();
        batch.insert("small".to_string(), json!(1));
        batch.insert("large".to_string(), json!("x".repeat(32)));

        let err = storage.set(batch).await.expect_err("quota");
        assert!(matches!(err, ProfileError::QuotaExceeded { .. }));
        assert!(storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn remove_ignores_absent_keys() {
        let storage = MemoryStorage::new();
        storage.set_one("a", json!(true)).await.expect("set");
        storage
            .remove(&["a".to_string(), "missing".to_string()])
            .await
            .expect("remove");
        assert!(storage.get_one("a").await.expect("get").is_none());
    }
}
