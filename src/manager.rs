//! Profile manager
//!
//! The explicit context object behind every user action: it owns the profile
//! store, the cookie manager, the confirmation capability and the working
//! set (the cookies currently being edited). Nothing here renders anything;
//! callers turn the returned outcomes into output.

use crate::confirm::Confirm;
use crate::cookies::{self, ApplyReport, CookieManager};
use crate::error::{ProfileError, Result};
use crate::i18n;
use crate::profile::store::{validate_name, ImportReport};
use crate::profile::{cookie_header, parse_cookie_string, Cookie, Profile, ProfileBundle};
use crate::profile::{ProfileStore, SaveOutcome};
use crate::utils::UrlUtils;
use std::sync::Arc;
use url::Url;

/// Result of an action that asks for confirmation first.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    /// The user said no; nothing was written.
    Declined,
}

impl<T> Outcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Declined => None,
        }
    }
}

/// Cookies being edited and the profile they came from, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    pub cookies: Vec<Cookie>,
    pub loaded_profile: Option<String>,
}

impl WorkingSet {
    fn clear(&mut self) {
        self.cookies.clear();
        self.loaded_profile = None;
    }
}

/// Result of loading a profile into the working set.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub profile: Profile,
    /// Present when a page was selected and the cookies were applied to it.
    pub applied: Option<ApplyReport>,
}

pub struct ProfileManager {
    store: ProfileStore,
    cookies: Arc<dyn CookieManager>,
    confirm: Box<dyn Confirm>,
    page: Option<Url>,
    working: WorkingSet,
}

impl ProfileManager {
    pub fn new(
        store: ProfileStore,
        cookies: Arc<dyn CookieManager>,
        confirm: Box<dyn Confirm>,
    ) -> Self {
        Self {
            store,
            cookies,
            confirm,
            page: None,
            working: WorkingSet::default(),
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working
    }

    /// Select the page cookies are captured from and applied to.
    pub fn set_page(&mut self, url: &str) -> Result<&Url> {
        Ok(self.page.insert(cookies::page_url(url)?))
    }

    pub fn page(&self) -> Result<&Url> {
        self.page.as_ref().ok_or_else(|| {
            ProfileError::InvalidInput("select an http(s) page first".to_string())
        })
    }

    /// Profile names matching `filter`, case-insensitively.
    pub async fn list(&self, filter: &str) -> Result<Vec<String>> {
        self.store.list(filter).await
    }

    /// Replace the working set with the page's current cookies.
    pub async fn capture_page(&mut self) -> Result<&[Cookie]> {
        let url = self.page()?.clone();
        let captured = self.cookies.get_all(url.as_str()).await?;
        log::debug!("captured {} cookie(s) from {}", captured.len(), url);
        self.working.cookies = captured;
        self.working.loaded_profile = None;
        Ok(&self.working.cookies)
    }

    /// Load a profile into the working set and apply it to the page, if one is selected.
    pub async fn load_profile(&mut self, name: &str) -> Result<LoadReport> {
        if name.trim().is_empty() {
            return Err(ProfileError::InvalidInput(
                "choose a profile to load".to_string(),
            ));
        }
        let profile = self.store.get(name).await?;
        self.working.cookies = profile.cookies.clone();
        self.working.loaded_profile = Some(profile.name.clone());

        let applied = match &self.page {
            Some(url) => {
                let report =
                    cookies::apply_to_page(self.cookies.as_ref(), url, &profile.cookies).await?;
                Some(report)
            }
            None => None,
        };
        Ok(LoadReport { profile, applied })
    }

    /// Apply the working set to the selected page.
    pub async fn apply_working_set(&self) -> Result<ApplyReport> {
        let url = self.page()?;
        cookies::apply_to_page(self.cookies.as_ref(), url, &self.working.cookies).await
    }

    /// Save the working set under `name`, asking before an overwrite.
    pub async fn save_as(&mut self, name: &str) -> Result<Outcome<SaveOutcome>> {
        let name = validate_name(name)?;
        let cookies = self.working.cookies.clone();
        let outcome = self.save_confirmed(&name, cookies).await?;
        if matches!(outcome, Outcome::Done(_)) {
            self.working.loaded_profile = Some(name);
        }
        Ok(outcome)
    }

    /// Write the working set back to the profile it was loaded from.
    pub async fn save_edited(&self) -> Result<Profile> {
        let name = self.working.loaded_profile.as_deref().ok_or_else(|| {
            ProfileError::InvalidInput(
                "no profile is loaded; load one or save the cookies under a new name".to_string(),
            )
        })?;
        self.store
            .save_unconditional(name, self.working.cookies.clone())
            .await
    }

    /// Create a profile from a `name=value; ...` string.
    pub async fn save_from_string(
        &mut self,
        name: &str,
        cookie_string: &str,
    ) -> Result<Outcome<SaveOutcome>> {
        let name = validate_name(name)?;
        if cookie_string.trim().is_empty() {
            return Err(ProfileError::InvalidInput(
                "paste a cookie string first".to_string(),
            ));
        }
        let cookies = parse_cookie_string(cookie_string);
        if cookies.is_empty() {
            return Err(ProfileError::InvalidInput(
                "the cookie string contains no name=value pairs".to_string(),
            ));
        }

        let outcome = self.save_confirmed(&name, cookies.clone()).await?;
        if matches!(outcome, Outcome::Done(_)) {
            self.working.cookies = cookies;
            self.working.loaded_profile = Some(name);
        }
        Ok(outcome)
    }

    async fn save_confirmed(
        &self,
        name: &str,
        cookies: Vec<Cookie>,
    ) -> Result<Outcome<SaveOutcome>> {
        if self.store.contains(name).await? {
            let question = i18n::message("confirm-overwrite", &[("name", name.to_string())]);
            if !self.confirm.confirm(&question) {
                return Ok(Outcome::Declined);
            }
        }
        Ok(Outcome::Done(self.store.save(name, cookies).await?))
    }

    /// Delete a profile after confirmation.
    pub async fn delete_profile(&mut self, name: &str) -> Result<Outcome<()>> {
        if name.trim().is_empty() {
            return Err(ProfileError::InvalidInput(
                "choose a profile to delete".to_string(),
            ));
        }
        let question = i18n::message("confirm-delete", &[("name", name.to_string())]);
        if !self.confirm.confirm(&question) {
            return Ok(Outcome::Declined);
        }

        self.store.delete(name).await?;
        if self.working.loaded_profile.as_deref() == Some(name) {
            self.working.clear();
        }
        Ok(Outcome::Done(()))
    }

    /// Drop one cookie from the working set.
    pub fn remove_cookie(&mut self, name: &str) -> bool {
        let before = self.working.cookies.len();
        self.working.cookies.retain(|cookie| cookie.name != name);
        self.working.cookies.len() != before
    }

    /// The working set as a `Cookie` header value.
    pub fn cookie_string(&self) -> String {
        cookie_header(&self.working.cookies)
    }

    /// Indented JSON export of the selected profiles.
    pub async fn export_profiles(&self, names: &[String]) -> Result<(ProfileBundle, String)> {
        if names.is_empty() {
            return Err(ProfileError::InvalidInput(
                "select at least one profile to export".to_string(),
            ));
        }
        let bundle = self.store.export_by_names(names).await?;
        if bundle.is_empty() {
            return Err(ProfileError::NotFound(names.join(", ")));
        }
        let json = bundle.to_json_pretty()?;
        Ok((bundle, json))
    }

    /// Merge an export file into the store after confirmation.
    ///
    /// The file is parsed before asking, so a malformed file writes nothing.
    pub async fn import_profiles(&self, json: &str) -> Result<Outcome<ImportReport>> {
        let bundle = ProfileBundle::from_json(json)?;
        let question = i18n::message("confirm-import", &[]);
        if !self.confirm.confirm(&question) {
            return Ok(Outcome::Declined);
        }
        Ok(Outcome::Done(self.store.import_merge(&bundle).await?))
    }

    /// Remove every cookie of the selected page after confirmation.
    pub async fn clear_page(&mut self) -> Result<Outcome<usize>> {
        let url = self.page()?.clone();
        let question = i18n::message("confirm-clear", &[("host", UrlUtils::display_host(&url))]);
        if !self.confirm.confirm(&question) {
            return Ok(Outcome::Declined);
        }
        let removed = cookies::clear_page(self.cookies.as_ref(), &url).await?;
        self.working.cookies.clear();
        Ok(Outcome::Done(removed))
    }
}
