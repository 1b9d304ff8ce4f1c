//! Cookie jars
//!
//! `MemoryCookieJar` follows the browser's acceptance rules closely enough
//! for the apply path to behave the same: a `domain` must cover the page
//! host, hosts without a registrable name refuse domain cookies, and secure
//! cookies need an https page. `FileCookieJar` persists a memory jar as JSON.

use super::{CookieDetails, CookieManager};
use crate::error::{ProfileError, Result};
use crate::profile::Cookie;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JarEntry {
    domain: String,
    host_only: bool,
    cookie: Cookie,
}

impl JarEntry {
    fn visible_to(&self, url: &Url, now: f64) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        let domain_matches = if self.host_only {
            host == self.domain
        } else {
            domain_covers(&self.domain, &host)
        };
        let secure_ok = !self.cookie.secure.unwrap_or(false) || url.scheme() == "https";
        let not_expired = self.cookie.expiration_date.map_or(true, |at| at > now);
        domain_matches && secure_ok && not_expired && url.path().starts_with(&self.cookie.path)
    }

    fn same_slot(&self, other: &JarEntry) -> bool {
        self.domain == other.domain
            && self.host_only == other.host_only
            && self.cookie.path == other.cookie.path
            && self.cookie.name == other.cookie.name
    }
}

fn domain_covers(domain: &str, host: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| ProfileError::InvalidUrl(format!("Invalid URL '{}': {}", url, e)))
}

/// Cookie jar held in memory.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    entries: Mutex<Vec<JarEntry>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<JarEntry>>> {
        self.entries
            .lock()
            .map_err(|_| ProfileError::Storage("cookie jar lock poisoned".to_string()))
    }

    fn entry_for(details: &CookieDetails) -> Result<JarEntry> {
        let url = parse_url(&details.url)?;
        let host = url
            .host_str()
            .map(str::to_lowercase)
            .ok_or_else(|| ProfileError::InvalidUrl(format!("URL has no host: {}", details.url)))?;

        if details.secure.unwrap_or(false) && url.scheme() != "https" {
            return Err(ProfileError::CookieRejected(format!(
                "secure cookie '{}' requires an https page",
                details.name
            )));
        }

        let (domain, host_only) = match &details.domain {
            Some(domain) => {
                let domain = domain.trim_start_matches('.').to_lowercase();
                if host.parse::<IpAddr>().is_ok() || !host.contains('.') {
                    return Err(ProfileError::DomainRejected(format!(
                        "host '{}' does not accept domain cookies",
                        host
                    )));
                }
                if !domain_covers(&domain, &host) {
                    return Err(ProfileError::DomainRejected(format!(
                        "'{}' does not cover host '{}'",
                        domain, host
                    )));
                }
                (domain, false)
            }
            None => (host, true),
        };

        Ok(JarEntry {
            domain: domain.clone(),
            host_only,
            cookie: Cookie {
                name: details.name.clone(),
                value: details.value.clone(),
                path: details.path.clone(),
                domain: Some(domain),
                secure: details.secure,
                http_only: details.http_only,
                same_site: details.same_site,
                session: Some(details.expiration_date.is_none()),
                expiration_date: details.expiration_date,
            },
        })
    }

    fn snapshot(&self) -> Result<Vec<JarEntry>> {
        Ok(self.lock()?.clone())
    }

    fn from_entries(entries: Vec<JarEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl CookieManager for MemoryCookieJar {
    async fn get_all(&self, url: &str) -> Result<Vec<Cookie>> {
        let url = parse_url(url)?;
        let now = now_seconds();
        Ok(self
            .lock()?
            .iter()
            .filter(|entry| entry.visible_to(&url, now))
            .map(|entry| entry.cookie.clone())
            .collect())
    }

    async fn set(&self, details: CookieDetails) -> Result<()> {
        let entry = Self::entry_for(&details)?;
        let mut entries = self.lock()?;
        match entries.iter_mut().find(|existing| existing.same_slot(&entry)) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    async fn remove(&self, url: &str, name: &str) -> Result<()> {
        let url = parse_url(url)?;
        let now = now_seconds();
        self.lock()?
            .retain(|entry| !(entry.cookie.name == name && entry.visible_to(&url, now)));
        Ok(())
    }
}

/// Memory jar mirrored to a JSON file after every change.
#[derive(Debug)]
pub struct FileCookieJar {
    path: PathBuf,
    jar: MemoryCookieJar,
}

impl FileCookieJar {
    /// Load the jar at `path`; a missing file is an empty jar.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text)?
        } else {
            Vec::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            jar: MemoryCookieJar::from_entries(entries),
        })
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&self.jar.snapshot()?)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

#[async_trait]
impl CookieManager for FileCookieJar {
    async fn get_all(&self, url: &str) -> Result<Vec<Cookie>> {
        self.jar.get_all(url).await
    }

    async fn set(&self, details: CookieDetails) -> Result<()> {
        self.jar.set(details).await?;
        self.persist()
    }

    async fn remove(&self, url: &str, name: &str) -> Result<()> {
        self.jar.remove(url, name).await?;
        self.persist()
    }
}
