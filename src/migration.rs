//! One-time upgrade from the monolithic profile record to split storage
//!
//! Older releases kept every profile inside a single `cookieProfiles` object,
//! first in the local area and later in the sync area. That object outgrows
//! the sync area's per-item quota, so it is unpacked into one record per
//! profile plus the name index. A flag in the sync area marks completion.

use crate::error::Result;
use crate::profile::store::{check_stored_name, profile_key, PROFILE_LIST_KEY};
use crate::profile::{Profile, ProfileBundle};
use crate::storage::{Items, StorageArea};
use serde_json::Value;
use std::sync::Arc;

/// Key of the legacy monolithic record in both areas.
pub const LEGACY_PROFILES_KEY: &str = "cookieProfiles";
/// Completion flag, kept in the sync area.
pub const MIGRATION_FLAG_KEY: &str = "migration_v2_completed";

/// Result of a migration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The flag was already set; nothing was read or written.
    AlreadyMigrated,
    /// The split layout was written (possibly with zero profiles) and the flag set.
    Migrated { profiles: usize },
}

/// Runs the split-storage upgrade against a sync and a local area.
pub struct MigrationRunner {
    sync: Arc<dyn StorageArea>,
    local: Arc<dyn StorageArea>,
}

impl MigrationRunner {
    pub fn new(sync: Arc<dyn StorageArea>, local: Arc<dyn StorageArea>) -> Self {
        Self { sync, local }
    }

    /// Whether the completion flag is set.
    pub async fn is_migrated(&self) -> Result<bool> {
        Ok(matches!(
            self.sync.get_one(MIGRATION_FLAG_KEY).await?,
            Some(Value::Bool(true))
        ))
    }

    /// Upgrade the stored layout unless that already happened.
    ///
    /// Any read or write failure before the flag is written aborts the attempt
    /// with the flag unset, so the next start repeats it from scratch.
    pub async fn run(&self) -> Result<MigrationOutcome> {
        if self.is_migrated().await? {
            return Ok(MigrationOutcome::AlreadyMigrated);
        }

        log::info!("starting split-storage migration");
        let local = read_legacy(self.local.as_ref(), "local").await?;
        let sync = read_legacy(self.sync.as_ref(), "sync").await?;
        let merged = merge_legacy(local, sync);

        let mut migrated = 0;
        let mut skipped = 0;
        if !merged.is_empty() {
            log::info!("found {} legacy profile(s) to migrate", merged.len());
            let (items, count) = split_layout(&merged)?;
            self.sync.set(items).await?;
            migrated = count;
            skipped = merged.len() - count;
        }

        if skipped == 0 {
            self.remove_legacy().await;
        } else {
            log::warn!(
                "kept the legacy '{}' record: {} profile(s) could not be migrated",
                LEGACY_PROFILES_KEY,
                skipped
            );
        }

        self.sync.set_one(MIGRATION_FLAG_KEY, Value::Bool(true)).await?;
        log::info!("split-storage migration complete");
        Ok(MigrationOutcome::Migrated { profiles: migrated })
    }

    async fn remove_legacy(&self) {
        let keys = [LEGACY_PROFILES_KEY.to_string()];
        for (area, storage) in [("sync", &self.sync), ("local", &self.local)] {
            if let Err(e) = storage.remove(&keys).await {
                log::warn!("could not remove legacy record from {} area: {}", area, e);
            }
        }
    }
}

async fn read_legacy(storage: &dyn StorageArea, area: &str) -> Result<ProfileBundle> {
    match storage.get_one(LEGACY_PROFILES_KEY).await? {
        None | Some(Value::Null) => Ok(ProfileBundle::new()),
        Some(value) => {
            let bundle = ProfileBundle::from_value(value)?;
            log::debug!("{} area holds {} legacy profile(s)", area, bundle.len());
            Ok(bundle)
        }
    }
}

/// Combine both legacy records; the local area wins on a name clash.
pub fn merge_legacy(local: ProfileBundle, sync: ProfileBundle) -> ProfileBundle {
    let mut merged = sync;
    for profile in local {
        merged.insert(profile);
    }
    merged
}

/// Records plus index for the split layout, as one batch, and the record count.
fn split_layout(bundle: &ProfileBundle) -> Result<(Items, usize)> {
    let mut items = Items::new();
    let mut names = Vec::with_capacity(bundle.len());
    for Profile { name, cookies } in bundle.iter() {
        if let Err(e) = check_stored_name(name) {
            log::warn!("skipping legacy profile '{}': {}", name, e);
            continue;
        }
        items.insert(profile_key(name), serde_json::to_value(cookies)?);
        names.push(name.clone());
    }
    let count = names.len();
    items.insert(PROFILE_LIST_KEY.to_string(), Value::from(names));
    Ok((items, count))
}
