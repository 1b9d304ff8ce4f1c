//! cookie-profiles - named cookie sets for web pages
//!
//! Profiles are stored one record per profile plus a name index, so a single
//! large profile cannot push the whole collection over a storage quota. The
//! crate provides the profile store, the one-time migration from the older
//! single-record layout, cookie application to pages and a CLI front end.

pub mod cli;
pub mod config;
pub mod confirm;
pub mod cookies;
pub mod error;
pub mod exit_code;
pub mod i18n;
pub mod logging;
pub mod manager;
pub mod migration;
pub mod output;
pub mod profile;
pub mod storage;
pub mod utils;

pub use error::{ProfileError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
