//! Cookie manager integration
//!
//! Applying a profile to a page means replacing every cookie the page can see
//! with the profile's cookies. The cookie manager behind that is pluggable: a
//! browser bridge, or one of the jars in [`jar`].

use crate::error::{ProfileError, Result};
use crate::profile::{Cookie, SameSite};
use crate::utils::UrlUtils;
use async_trait::async_trait;
use url::Url;

pub mod jar;

pub use jar::{FileCookieJar, MemoryCookieJar};

/// Everything needed to set one cookie on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieDetails {
    pub url: String,
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    pub same_site: Option<SameSite>,
    pub expiration_date: Option<f64>,
}

impl CookieDetails {
    /// Details for placing a saved cookie on the page at `url`.
    ///
    /// The domain is pinned to the page host; the expiration date is only
    /// carried over for persistent cookies.
    pub fn for_page(url: &Url, cookie: &Cookie) -> Self {
        Self {
            url: url.to_string(),
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            path: if cookie.path.is_empty() {
                "/".to_string()
            } else {
                cookie.path.clone()
            },
            domain: url.host_str().map(str::to_string),
            secure: cookie.secure.filter(|secure| *secure),
            http_only: cookie.http_only.filter(|http_only| *http_only),
            same_site: cookie.same_site,
            expiration_date: if cookie.is_session() {
                None
            } else {
                cookie.expiration_date
            },
        }
    }
}

/// Request/response interface of a cookie manager.
#[async_trait]
pub trait CookieManager: Send + Sync {
    /// Every cookie visible to `url`.
    async fn get_all(&self, url: &str) -> Result<Vec<Cookie>>;
    /// Set one cookie; a rejected `domain` is reported as `DomainRejected`.
    async fn set(&self, details: CookieDetails) -> Result<()>;
    /// Remove the cookie called `name` visible to `url`.
    async fn remove(&self, url: &str, name: &str) -> Result<()>;
}

/// Result of applying a cookie list to a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Cookies removed from the page first.
    pub cleared: usize,
    /// Cookies set, including ones that needed the domain-less retry.
    pub applied: usize,
    /// Cookies that were only accepted without a `domain`.
    pub retried: Vec<String>,
    /// Cookies the cookie manager refused.
    pub skipped: Vec<String>,
}

/// Parse a page URL and make sure cookies can be placed on it.
pub fn page_url(input: &str) -> Result<Url> {
    let url = UrlUtils::validate_url(input)?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ProfileError::InvalidInput(format!(
            "cookies can only be managed on http(s) pages, not '{}'",
            input
        ))),
    }
}

/// Remove every cookie visible to the page.
pub async fn clear_page(manager: &dyn CookieManager, url: &Url) -> Result<usize> {
    let existing = manager.get_all(url.as_str()).await?;
    for cookie in &existing {
        manager.remove(url.as_str(), &cookie.name).await?;
    }
    log::debug!("cleared {} cookie(s) from {}", existing.len(), url);
    Ok(existing.len())
}

/// Replace the page's cookies with `cookies`.
///
/// A cookie whose domain is rejected is retried once without a domain. A
/// cookie that still fails is logged and skipped; the rest still apply.
pub async fn apply_to_page(
    manager: &dyn CookieManager,
    url: &Url,
    cookies: &[Cookie],
) -> Result<ApplyReport> {
    let mut report = ApplyReport {
        cleared: clear_page(manager, url).await?,
        ..ApplyReport::default()
    };

    for cookie in cookies {
        let details = CookieDetails::for_page(url, cookie);
        match manager.set(details.clone()).await {
            Ok(()) => report.applied += 1,
            Err(e) if e.is_domain_error() => {
                let retry = CookieDetails {
                    domain: None,
                    ..details
                };
                match manager.set(retry).await {
                    Ok(()) => {
                        report.applied += 1;
                        report.retried.push(cookie.name.clone());
                    }
                    Err(e) => {
                        log::warn!("could not set cookie '{}' after retry: {}", cookie.name, e);
                        report.skipped.push(cookie.name.clone());
                    }
                }
            }
            Err(e) => {
                log::warn!("could not set cookie '{}': {}", cookie.name, e);
                report.skipped.push(cookie.name.clone());
            }
        }
    }

    log::info!(
        "applied {} of {} cookie(s) to {}",
        report.applied,
        cookies.len(),
        url
    );
    Ok(report)
}
