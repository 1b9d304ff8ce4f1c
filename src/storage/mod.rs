//! Key-value storage areas
//!
//! Profiles live inside a quota-limited key-value area, the same shape a
//! browser extension gets from its storage API: values are JSON documents,
//! writes are batches of keys, and every item has a small size ceiling.
//! Two areas exist side by side, `sync` (quota-limited, holds the split
//! profile layout) and `local` (unlimited, only ever holds legacy data).

use crate::error::{ProfileError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::{SqliteDatabase, SqliteStorage};

/// A batch of keys and their JSON values.
pub type Items = Map<String, Value>;

/// Which storage area a handle points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageAreaKind {
    Local,
    Sync,
}

impl StorageAreaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageAreaKind::Local => "local",
            StorageAreaKind::Sync => "sync",
        }
    }
}

impl fmt::Display for StorageAreaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request/response interface of a storage area.
///
/// Missing keys are simply absent from the returned map. `set` applies the
/// whole batch or nothing.
#[async_trait]
pub trait StorageArea: Send + Sync {
    /// Read the given keys.
    async fn get(&self, keys: &[String]) -> Result<Items>;
    /// Read every item in the area.
    async fn get_all(&self) -> Result<Items>;
    /// Write a batch of items.
    async fn set(&self, items: Items) -> Result<()>;
    /// Remove the given keys; absent keys are ignored.
    async fn remove(&self, keys: &[String]) -> Result<()>;

    /// Read a single key.
    async fn get_one(&self, key: &str) -> Result<Option<Value>> {
        let mut items = self.get(&[key.to_string()]).await?;
        Ok(items.remove(key))
    }

    /// Write a single key.
    async fn set_one(&self, key: &str, value: Value) -> Result<()> {
        let mut items = Items::new();
        items.insert(key.to_string(), value);
        self.set(items).await
    }
}

/// Size limits enforced on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageQuota {
    pub bytes_per_item: Option<usize>,
    pub total_bytes: Option<usize>,
    pub max_items: Option<usize>,
}

impl StorageQuota {
    /// Per-item ceiling of the browser sync area.
    pub const SYNC_BYTES_PER_ITEM: usize = 8_192;
    pub const SYNC_TOTAL_BYTES: usize = 102_400;
    pub const SYNC_MAX_ITEMS: usize = 512;

    /// Limits matching the browser sync area.
    pub fn sync() -> Self {
        Self {
            bytes_per_item: Some(Self::SYNC_BYTES_PER_ITEM),
            total_bytes: Some(Self::SYNC_TOTAL_BYTES),
            max_items: Some(Self::SYNC_MAX_ITEMS),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            bytes_per_item: None,
            total_bytes: None,
            max_items: None,
        }
    }

    /// Check a pending batch against the items already stored.
    ///
    /// `sizes` holds the current size of every stored key.
    pub fn check(&self, mut sizes: HashMap<String, usize>, batch: &Items) -> Result<()> {
        for (key, value) in batch {
            let size = item_size(key, value);
            if let Some(limit) = self.bytes_per_item {
                if size > limit {
                    return Err(ProfileError::QuotaExceeded {
                        key: key.clone(),
                        size,
                        limit,
                    });
                }
            }
            sizes.insert(key.clone(), size);
        }

        if let Some(limit) = self.max_items {
            if sizes.len() > limit {
                return Err(ProfileError::QuotaExceeded {
                    key: "*".to_string(),
                    size: sizes.len(),
                    limit,
                });
            }
        }

        if let Some(limit) = self.total_bytes {
            let total: usize = sizes.values().sum();
            if total > limit {
                return Err(ProfileError::QuotaExceeded {
                    key: "*".to_string(),
                    size: total,
                    limit,
                });
            }
        }

        Ok(())
    }
}

impl Default for StorageQuota {
    fn default() -> Self {
        Self::sync()
    }
}

/// Bytes an item occupies: its key plus the serialized JSON value.
pub fn item_size(key: &str, value: &Value) -> usize {
    key.len() + value.to_string().len()
}

#[cfg(test)]
mod tests {
    use super::{item_size, Items, StorageAreaKind, StorageQuota};
    use crate::error::ProfileError;
    use serde_json::json;
    use std::collections::HashMap;

    fn sizes(entries: &[(&str, usize)]) -> HashMap<String, usize> {
        entries
            .iter()
            .map(|(key, size)| (key.to_string(), *size))
            .collect()
    }

    #[test]
    fn item_size_counts_key_and_serialized_value() {
        assert_eq!(item_size("k", &json!("v")), 4);
        assert_eq!(item_size("profile_list", &json!(["a"])), 12 + 5);
    }

    #[test]
    fn quota_rejects_oversized_item() {
        let quota = StorageQuota {
            bytes_per_item: Some(10),
            total_bytes: None,
            max_items: None,
        };
        let mut batch = Items::new();
        batch.insert("key".to_string(), json!("a long value"));
        let err = quota.check(HashMap::new(), &batch).expect_err("too large");
        assert!(matches!(err, ProfileError::QuotaExceeded { limit: 10, .. }));
    }

    #[test]
    fn quota_counts_existing_items_toward_total() {
        let quota = StorageQuota {
            bytes_per_item: None,
            total_bytes: Some(20),
            max_items: Some(2),
        };
        let mut batch = Items::new();
        batch.insert("b".to_string(), json!("12345"));
        quota.check(sizes(&[("a", 10)]), &batch).expect("fits");

        batch.insert("c".to_string(), json!(1));
        let err = quota.check(sizes(&[("a", 10)]), &batch).expect_err("too many items");
        assert!(matches!(err, ProfileError::QuotaExceeded { limit: 2, .. }));
    }

    #[test]
    fn quota_replaces_existing_size_on_overwrite() {
        let quota = StorageQuota {
            bytes_per_item: None,
            total_bytes: Some(12),
            max_items: None,
        };
        let mut batch = Items::new();
        batch.insert("a".to_string(), json!("1234"));
        quota.check(sizes(&[("a", 11)]), &batch).expect("overwrite shrinks item");
    }

    #[test]
    fn area_kind_displays_area_name() {
        assert_eq!(StorageAreaKind::Sync.to_string(), "sync");
        assert_eq!(StorageAreaKind::Local.as_str(), "local");
    }
}
