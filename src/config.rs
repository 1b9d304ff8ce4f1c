//! Configuration management for cookie-profiles

use crate::error::{ProfileError, Result};
use crate::storage::StorageQuota;
use std::path::PathBuf;

/// File name offered for profile exports
pub const EXPORT_FILE_NAME: &str = "cookie_profiles_export.json";

const APP_DIR: &str = "cookie-profiles";
const DATABASE_FILE: &str = "storage.sqlite3";
const JAR_FILE: &str = "cookies.json";

/// Output configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub file: Option<PathBuf>,
    pub verbose: bool,
    pub silent: bool,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file holding both storage areas
    pub database: PathBuf,
    /// JSON cookie jar standing in for the browser's cookie store
    pub jar: PathBuf,
    /// Limits enforced on the sync area
    pub sync_quota: StorageQuota,
    /// Answer every confirmation prompt with yes
    pub assume_yes: bool,
    pub output: OutputConfig,
}

impl Config {
    /// Directory holding the default database and jar
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ProfileError::Config("Cannot determine data directory".to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        let dir = Config::data_dir().unwrap_or_else(|_| PathBuf::from(".").join(APP_DIR));
        Config {
            database: dir.join(DATABASE_FILE),
            jar: dir.join(JAR_FILE),
            sync_quota: StorageQuota::sync(),
            assume_yes: false,
            output: OutputConfig::default(),
        }
    }
}
