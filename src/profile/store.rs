//! Split-key profile store
//!
//! Every profile is kept under its own key (`profile_<name>`) so that no
//! single item outgrows the per-item quota, and the ordered list of names is
//! kept under `profile_list`. A name is in the index exactly when its record
//! exists; every operation below leaves that true when it succeeds.

use super::{Cookie, Profile, ProfileBundle};
use crate::error::{ProfileError, Result};
use crate::storage::{Items, StorageArea};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Prefix of every profile record key.
pub const PROFILE_PREFIX: &str = "profile_";
/// Key of the ordered name index.
pub const PROFILE_LIST_KEY: &str = "profile_list";

/// Storage key of a profile record.
pub fn profile_key(name: &str) -> String {
    format!("{}{}", PROFILE_PREFIX, name)
}

/// Whether `name` maps onto the index key and so can never be a profile.
pub fn is_reserved(name: &str) -> bool {
    profile_key(name) == PROFILE_LIST_KEY
}

/// Reject names that cannot be stored, keeping the name as given.
///
/// Used for names that come from stored data (import files, legacy records),
/// where the key itself is the profile name.
pub fn check_stored_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ProfileError::InvalidInput(
            "profile name must not be empty".to_string(),
        ));
    }
    if is_reserved(name) {
        return Err(ProfileError::InvalidInput(format!(
            "profile name '{}' is reserved",
            name
        )));
    }
    Ok(())
}

/// Trim a typed profile name and reject names that cannot be stored.
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    check_stored_name(name)?;
    Ok(name.to_string())
}

/// Whether `save` created a new profile or replaced an existing one.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(Profile),
    Overwritten(Profile),
}

/// Names touched by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
}

/// Changes made by [`ProfileStore::repair`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Index entries dropped because their record was missing.
    pub dropped: Vec<String>,
    /// Records appended to the index because it did not list them.
    pub adopted: Vec<String>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.adopted.is_empty()
    }
}

/// Profile CRUD over a key-value storage area.
#[derive(Clone)]
pub struct ProfileStore {
    storage: Arc<dyn StorageArea>,
}

impl ProfileStore {
    pub fn new(storage: Arc<dyn StorageArea>) -> Self {
        Self { storage }
    }

    /// The full index in insertion order.
    pub async fn names(&self) -> Result<Vec<String>> {
        match self.storage.get_one(PROFILE_LIST_KEY).await? {
            Some(value) => decode_index(value),
            None => Ok(Vec::new()),
        }
    }

    /// Index entries whose lowercase form contains the lowercase filter.
    pub async fn list(&self, filter: &str) -> Result<Vec<String>> {
        let needle = filter.to_lowercase();
        let names = self.names().await?;
        Ok(names
            .into_iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect())
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.names().await?.iter().any(|n| n == name))
    }

    /// Read one profile record.
    pub async fn get(&self, name: &str) -> Result<Profile> {
        if is_reserved(name) {
            return Err(ProfileError::NotFound(name.to_string()));
        }
        let key = profile_key(name);
        match self.storage.get_one(&key).await? {
            Some(value) => Ok(Profile::new(name, decode_cookies(&key, value)?)),
            None => Err(ProfileError::NotFound(name.to_string())),
        }
    }

    /// Write a profile, adding it to the index when the name is new.
    ///
    /// Overwriting an existing name needs the caller's prior confirmation;
    /// the index is left untouched in that case.
    pub async fn save(&self, name: &str, cookies: Vec<Cookie>) -> Result<SaveOutcome> {
        let name = validate_name(name)?;
        let mut names = self.names().await?;
        let exists = names.contains(&name);

        let mut items = Items::new();
        items.insert(profile_key(&name), serde_json::to_value(&cookies)?);
        if !exists {
            names.push(name.clone());
            items.insert(PROFILE_LIST_KEY.to_string(), Value::from(names));
        }
        self.storage.set(items).await?;

        let profile = Profile::new(name, cookies);
        if exists {
            log::info!("overwrote profile '{}'", profile.name);
            Ok(SaveOutcome::Overwritten(profile))
        } else {
            log::info!("created profile '{}'", profile.name);
            Ok(SaveOutcome::Created(profile))
        }
    }

    /// Rewrite the record of an already indexed profile.
    pub async fn save_unconditional(&self, name: &str, cookies: Vec<Cookie>) -> Result<Profile> {
        if is_reserved(name) || !self.contains(name).await? {
            return Err(ProfileError::NotFound(name.to_string()));
        }
        self.storage
            .set_one(&profile_key(name), serde_json::to_value(&cookies)?)
            .await?;
        log::info!("saved edits to profile '{}'", name);
        Ok(Profile::new(name, cookies))
    }

    /// Remove a profile record, then its index entry.
    ///
    /// The two steps are separate writes; if the second fails the index keeps
    /// an orphaned entry until [`ProfileStore::repair`] runs.
    pub async fn delete(&self, name: &str) -> Result<()> {
        if is_reserved(name) {
            log::debug!("'{}' is not a profile name; nothing to delete", name);
            return Ok(());
        }
        self.storage.remove(&[profile_key(name)]).await?;

        let names = self.names().await?;
        let remaining: Vec<String> = names.iter().filter(|n| *n != name).cloned().collect();
        if remaining.len() == names.len() {
            log::debug!("profile '{}' was not indexed", name);
        }
        self.storage
            .set_one(PROFILE_LIST_KEY, Value::from(remaining))
            .await?;
        log::info!("deleted profile '{}'", name);
        Ok(())
    }

    /// Read the records of the requested names, skipping absent ones.
    pub async fn export_by_names(&self, names: &[String]) -> Result<ProfileBundle> {
        let names: Vec<&String> = names.iter().filter(|name| !is_reserved(name)).collect();
        let keys: Vec<String> = names.iter().map(|name| profile_key(name)).collect();
        let mut items = self.storage.get(&keys).await?;

        let mut bundle = ProfileBundle::new();
        for (name, key) in names.into_iter().zip(keys) {
            if let Some(value) = items.remove(&key) {
                bundle.insert(Profile::new(name.clone(), decode_cookies(&key, value)?));
            }
        }
        Ok(bundle)
    }

    /// Write every imported profile and merge the names into the index.
    ///
    /// Names are taken verbatim from the file. Existing profiles of the same
    /// name are replaced. The records and the merged index go out as one batch.
    pub async fn import_merge(&self, bundle: &ProfileBundle) -> Result<ImportReport> {
        let mut validated = Vec::with_capacity(bundle.len());
        for profile in bundle.iter() {
            check_stored_name(&profile.name)?;
            validated.push((profile.name.clone(), &profile.cookies));
        }

        let mut names = self.names().await?;
        let mut seen: HashSet<String> = names.iter().cloned().collect();
        let mut report = ImportReport::default();
        let mut items = Items::new();

        for (name, cookies) in validated {
            items.insert(profile_key(&name), serde_json::to_value(cookies)?);
            if seen.insert(name.clone()) {
                names.push(name.clone());
                report.created.push(name);
            } else if !report.updated.contains(&name) && !report.created.contains(&name) {
                report.updated.push(name);
            }
        }
        items.insert(PROFILE_LIST_KEY.to_string(), Value::from(names));

        self.storage.set(items).await?;
        log::info!(
            "imported {} new and {} updated profile(s)",
            report.created.len(),
            report.updated.len()
        );
        Ok(report)
    }

    /// Restore the index/record correspondence.
    ///
    /// Index entries without a record are dropped and records missing from the
    /// index are appended in key order. The index is only written when it
    /// changes.
    pub async fn repair(&self) -> Result<RepairReport> {
        let all = self.storage.get_all().await?;
        let names = match all.get(PROFILE_LIST_KEY) {
            Some(value) => decode_index(value.clone())?,
            None => Vec::new(),
        };

        let mut recorded: Vec<String> = all
            .keys()
            .filter(|key| key.as_str() != PROFILE_LIST_KEY)
            .filter_map(|key| key.strip_prefix(PROFILE_PREFIX))
            .map(str::to_string)
            .collect();
        recorded.sort();

        let mut report = RepairReport::default();
        let mut repaired = Vec::with_capacity(names.len());
        for name in names {
            if !recorded.contains(&name) {
                report.dropped.push(name);
            } else if !repaired.contains(&name) {
                repaired.push(name);
            } else {
                report.dropped.push(name);
            }
        }
        for name in recorded {
            if !repaired.contains(&name) {
                repaired.push(name.clone());
                report.adopted.push(name);
            }
        }

        if !report.is_clean() {
            self.storage
                .set_one(PROFILE_LIST_KEY, Value::from(repaired))
                .await?;
            log::warn!(
                "repaired profile index: dropped {:?}, adopted {:?}",
                report.dropped,
                report.adopted
            );
        }
        Ok(report)
    }
}

fn decode_index(value: Value) -> Result<Vec<String>> {
    serde_json::from_value(value)
        .map_err(|e| ProfileError::Storage(format!("Corrupt profile index: {}", e)))
}

fn decode_cookies(key: &str, value: Value) -> Result<Vec<Cookie>> {
    serde_json::from_value(value)
        .map_err(|e| ProfileError::Storage(format!("Corrupt profile record '{}': {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::{
        check_stored_name, is_reserved, profile_key, validate_name, ProfileStore, SaveOutcome,
        PROFILE_LIST_KEY,
    };
    use crate::error::ProfileError;
    use crate::profile::{Cookie, Profile, ProfileBundle};
    use crate::storage::{MemoryStorage, StorageArea};
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> (ProfileStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (ProfileStore::new(storage.clone()), storage)
    }

    fn cookies(pairs: &[(&str, &str)]) -> Vec<Cookie> {
        pairs
            .iter()
            .map(|(name, value)| Cookie::new(*name, *value))
            .collect()
    }

    async fn assert_consistent(store: &ProfileStore, storage: &MemoryStorage) {
        let names = store.names().await.expect("names");
        let snapshot = storage.snapshot();
        for name in &names {
            assert!(snapshot.contains_key(&profile_key(name)), "missing record for {}", name);
        }
        let records = snapshot
            .keys()
            .filter(|key| key.as_str() != PROFILE_LIST_KEY && key.starts_with("profile_"))
            .count();
        assert_eq!(records, names.len());
    }

    #[test]
    fn validate_name_trims_and_rejects_reserved() {
        assert_eq!(validate_name("  work ").expect("valid"), "work");
        assert!(matches!(validate_name("   "), Err(ProfileError::InvalidInput(_))));
        assert!(matches!(validate_name("list"), Err(ProfileError::InvalidInput(_))));
        assert!(is_reserved("list"));
        assert!(!is_reserved(" list "));
        check_stored_name(" padded ").expect("kept verbatim");
    }

    #[tokio::test]
    async fn missing_index_reads_as_empty() {
        let (store, _) = store();
        assert!(store.list("").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn list_filters_case_insensitively() {
        let (store, _) = store();
        store.save("Alpha Profile", vec![]).await.expect("save");
        store.save("Beta Test", vec![]).await.expect("save");

        assert_eq!(store.list("beta").await.expect("list"), vec!["Beta Test"]);
        assert_eq!(store.list("PROFILE").await.expect("list"), vec!["Alpha Profile"]);
        assert_eq!(store.list("").await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn get_missing_profile_is_not_found() {
        let (store, _) = store();
        let err = store.get("ghost").await.expect_err("missing");
        assert!(matches!(err, ProfileError::NotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn overwrite_keeps_single_index_entry() {
        let (store, storage) = store();
        let first = store.save("A", cookies(&[("x", "1")])).await.expect("save");
        assert!(matches!(first, SaveOutcome::Created(_)));

        let second = store.save("A", cookies(&[("y", "2")])).await.expect("save");
        assert!(matches!(second, SaveOutcome::Overwritten(_)));

        assert_eq!(store.names().await.expect("names"), vec!["A"]);
        assert_eq!(store.get("A").await.expect("get").cookies, cookies(&[("y", "2")]));
        assert_consistent(&store, &storage).await;
    }

    #[tokio::test]
    async fn index_matches_records_across_saves_and_deletes() {
        let (store, storage) = store();
        let script: &[(&str, bool)] = &[
            ("a", true),
            ("b", true),
            ("a", true),
            ("c", true),
            ("b", false),
            ("d", true),
            ("a", false),
            ("missing", false),
            ("b", true),
        ];
        for (name, is_save) in script {
            if *is_save {
                store.save(name, cookies(&[("k", *name)])).await.expect("save");
            } else {
                store.delete(name).await.expect("delete");
            }
            assert_consistent(&store, &storage).await;
        }
        assert_eq!(store.names().await.expect("names"), vec!["c", "d", "b"]);
    }

    #[tokio::test]
    async fn save_unconditional_requires_indexed_name() {
        let (store, storage) = store();
        let err = store
            .save_unconditional("nobody", cookies(&[("x", "1")]))
            .await
            .expect_err("not indexed");
        assert!(matches!(err, ProfileError::NotFound(_)));
        assert!(storage.snapshot().is_empty());

        store.save("work", vec![]).await.expect("save");
        store
            .save_unconditional("work", cookies(&[("x", "1")]))
            .await
            .expect("edit");
        assert_eq!(store.get("work").await.expect("get").cookies.len(), 1);
        assert_eq!(store.names().await.expect("names"), vec!["work"]);
    }

    #[tokio::test]
    async fn delete_cleans_record_and_index() {
        let (store, storage) = store();
        store.save("A", cookies(&[("x", "1")])).await.expect("save");
        store.save("B", cookies(&[("y", "2")])).await.expect("save");

        store.delete("A").await.expect("delete");
        assert_eq!(store.names().await.expect("names"), vec!["B"]);
        assert!(storage.get_one("profile_A").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn reserved_name_never_reaches_the_index() {
        let (store, storage) = store();
        store.save("A", cookies(&[("x", "1")])).await.expect("save");
        store.save("B", cookies(&[("y", "2")])).await.expect("save");

        store.delete("list").await.expect("delete is a no-op");
        assert_eq!(store.names().await.expect("names"), vec!["A", "B"]);
        assert_consistent(&store, &storage).await;

        let err = store.get("list").await.expect_err("not a profile");
        assert!(matches!(err, ProfileError::NotFound(_)));
        let err = store
            .save_unconditional("list", vec![])
            .await
            .expect_err("not a profile");
        assert!(matches!(err, ProfileError::NotFound(_)));

        let bundle = store
            .export_by_names(&["list".to_string(), "A".to_string()])
            .await
            .expect("export");
        assert_eq!(bundle.names(), vec!["A"]);
        assert_eq!(store.names().await.expect("names"), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn import_keeps_names_verbatim() {
        let (store, storage) = store();
        store.save("A", cookies(&[("keep", "1")])).await.expect("save");

        let bundle = ProfileBundle::from_json(r#"{" A ": [{"name": "new", "value": "2"}]}"#)
            .expect("bundle");
        let report = store.import_merge(&bundle).await.expect("import");

        assert_eq!(report.created, vec![" A "]);
        assert_eq!(store.names().await.expect("names"), vec!["A", " A "]);
        assert_eq!(store.get("A").await.expect("get").cookies, cookies(&[("keep", "1")]));
        assert_eq!(store.get(" A ").await.expect("get").cookies, cookies(&[("new", "2")]));
        assert_consistent(&store, &storage).await;

        let blank = ProfileBundle::from_json(r#"{"  ": []}"#).expect("bundle");
        let err = store.import_merge(&blank).await.expect_err("blank name");
        assert!(matches!(err, ProfileError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn export_skips_absent_names() {
        let (store, _) = store();
        store.save("A", cookies(&[("x", "1")])).await.expect("save");
        store.save("B", cookies(&[("y", "2")])).await.expect("save");

        let bundle = store
            .export_by_names(&["A".to_string(), "C".to_string()])
            .await
            .expect("export");
        assert_eq!(bundle.names(), vec!["A"]);
        assert_eq!(bundle.get("A").map(|p| p.cookies.clone()), Some(cookies(&[("x", "1")])));
    }

    #[tokio::test]
    async fn import_appends_new_names_after_existing() {
        let (store, storage) = store();
        store.save("X", vec![]).await.expect("save");
        store.save("Y", cookies(&[("old", "1")])).await.expect("save");

        let bundle: ProfileBundle = vec![
            Profile::new("Y", cookies(&[("new", "2")])),
            Profile::new("Z", cookies(&[("z", "3")])),
        ]
        .into_iter()
        .collect();
        let report = store.import_merge(&bundle).await.expect("import");

        assert_eq!(report.created, vec!["Z"]);
        assert_eq!(report.updated, vec!["Y"]);
        assert_eq!(store.names().await.expect("names"), vec!["X", "Y", "Z"]);
        assert_eq!(store.get("Y").await.expect("get").cookies, cookies(&[("new", "2")]));
        assert_eq!(store.get("Z").await.expect("get").cookies, cookies(&[("z", "3")]));
        assert_consistent(&store, &storage).await;
    }

    #[tokio::test]
    async fn import_with_reserved_name_writes_nothing() {
        let (store, storage) = store();
        let bundle: ProfileBundle = vec![Profile::new("ok", vec![]), Profile::new("list", vec![])]
            .into_iter()
            .collect();
        let err = store.import_merge(&bundle).await.expect_err("reserved");
        assert!(matches!(err, ProfileError::InvalidInput(_)));
        assert!(storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn repair_drops_orphans_and_adopts_strays() {
        let (store, storage) = store();
        storage
            .set_one(PROFILE_LIST_KEY, json!(["gone", "kept", "kept"]))
            .await
            .expect("index");
        storage.set_one("profile_kept", json!([])).await.expect("record");
        storage.set_one("profile_stray", json!([])).await.expect("record");
        storage
            .set_one("migration_v2_completed", json!(true))
            .await
            .expect("flag");

        let report = store.repair().await.expect("repair");
        assert_eq!(report.dropped, vec!["gone", "kept"]);
        assert_eq!(report.adopted, vec!["stray"]);
        assert_eq!(store.names().await.expect("names"), vec!["kept", "stray"]);
        assert_consistent(&store, &storage).await;

        assert!(store.repair().await.expect("second repair").is_clean());
    }

    #[tokio::test]
    async fn corrupt_index_is_reported() {
        let (store, storage) = store();
        storage
            .set_one(PROFILE_LIST_KEY, json!({"not": "a list"}))
            .await
            .expect("index");
        let err = store.names().await.expect_err("corrupt");
        assert!(matches!(err, ProfileError::Storage(_)));
    }
}
