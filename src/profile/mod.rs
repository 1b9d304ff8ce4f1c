//! Cookie profiles
//!
//! A profile is a named, ordered list of cookies. On disk a profile record is
//! just the cookie array; the name lives in the record key and in the index.

use crate::error::{ProfileError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub mod store;

pub use store::{ProfileStore, RepairReport, SaveOutcome};

/// One captured cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Session cookie with only a name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: default_path(),
            domain: None,
            secure: None,
            http_only: None,
            same_site: None,
            session: None,
            expiration_date: None,
        }
    }

    /// Whether the cookie lives only for the browser session.
    pub fn is_session(&self) -> bool {
        self.session.unwrap_or(false) || self.expiration_date.is_none()
    }
}

/// Cross-site policy of a cookie, spelled the way browsers report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    NoRestriction,
    Lax,
    Strict,
    Unspecified,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SameSite::NoRestriction => "no_restriction",
            SameSite::Lax => "lax",
            SameSite::Strict => "strict",
            SameSite::Unspecified => "unspecified",
        };
        f.write_str(value)
    }
}

impl FromStr for SameSite {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no_restriction" | "none" => Ok(SameSite::NoRestriction),
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "unspecified" => Ok(SameSite::Unspecified),
            _ => Err(()),
        }
    }
}

/// A named cookie collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub cookies: Vec<Cookie>,
}

impl Profile {
    pub fn new(name: impl Into<String>, cookies: Vec<Cookie>) -> Self {
        Self {
            name: name.into(),
            cookies,
        }
    }
}

/// Ordered `name -> cookies` mapping.
///
/// This is the shape of export files and of the legacy monolithic record.
/// Entry order follows the JSON object order; a repeated name replaces the
/// earlier cookies but keeps the earlier position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileBundle {
    profiles: Vec<Profile>,
}

impl ProfileBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile, keeping the position of an existing name.
    pub fn insert(&mut self, profile: Profile) {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => existing.cookies = profile.cookies,
            None => self.profiles.push(profile),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    /// Build a bundle from a JSON object value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(ProfileError::MalformedImport(
                "expected an object mapping profile names to cookie lists".to_string(),
            ));
        };

        let mut bundle = ProfileBundle::new();
        for (name, cookies) in map {
            let cookies: Vec<Cookie> = serde_json::from_value(cookies).map_err(|e| {
                ProfileError::MalformedImport(format!("profile '{}': {}", name, e))
            })?;
            bundle.insert(Profile::new(name, cookies));
        }
        Ok(bundle)
    }

    /// Parse the text of an export file.
    pub fn from_json(input: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| ProfileError::MalformedImport(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value> {
        let mut map = Map::new();
        for profile in &self.profiles {
            map.insert(profile.name.clone(), serde_json::to_value(&profile.cookies)?);
        }
        Ok(Value::Object(map))
    }

    /// Indented JSON, the export file format.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }
}

impl FromIterator<Profile> for ProfileBundle {
    fn from_iter<T: IntoIterator<Item = Profile>>(iter: T) -> Self {
        let mut bundle = ProfileBundle::new();
        for profile in iter {
            bundle.insert(profile);
        }
        bundle
    }
}

impl IntoIterator for ProfileBundle {
    type Item = Profile;
    type IntoIter = std::vec::IntoIter<Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.into_iter()
    }
}

/// Parse a `name=value; name2=value2` string into session cookies.
///
/// Segments without exactly one `=` or with an empty name are dropped.
pub fn parse_cookie_string(input: &str) -> Vec<Cookie> {
    input
        .split(';')
        .filter_map(|segment| {
            let parts: Vec<&str> = segment.trim().split('=').collect();
            match parts.as_slice() {
                [name, value] if !name.trim().is_empty() => {
                    Some(Cookie::new(name.trim(), value.trim()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Render cookies as a `Cookie` header value.
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests;
