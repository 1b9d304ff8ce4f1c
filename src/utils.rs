//! Utility functions and helpers

use crate::error::{ProfileError, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// URL validation and parsing utilities
pub struct UrlUtils;

impl UrlUtils {
    /// Validate and normalize URL
    pub fn validate_url(input: &str) -> Result<Url> {
        // Add http:// if no scheme is provided
        let url_str = if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{}", input)
        };

        Url::parse(&url_str)
            .map_err(|e| ProfileError::InvalidUrl(format!("Invalid URL '{}': {}", input, e)))
    }

    /// Host name shown to the user when talking about a page
    pub fn display_host(url: &Url) -> String {
        match url.port() {
            Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
            None => url.host_str().unwrap_or_default().to_string(),
        }
    }
}

/// File system utilities
pub struct FileUtils;

impl FileUtils {
    /// Expand tilde (~) in file paths
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if path == "~" || path.starts_with("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                Ok(home_dir.join(path.trim_start_matches('~').trim_start_matches('/')))
            } else {
                Err(ProfileError::Config(
                    "Cannot determine home directory".to_string(),
                ))
            }
        } else {
            Ok(PathBuf::from(path))
        }
    }

    /// Check if file exists and is readable
    pub fn check_file_readable(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ProfileError::FileNotFound(format!("{:?}", path)));
        }

        if !path.is_file() {
            return Err(ProfileError::Config(format!("Path is not a file: {:?}", path)));
        }

        std::fs::File::open(path).map_err(|e| {
            ProfileError::PermissionDenied(format!("Cannot read file {:?}: {}", path, e))
        })?;

        Ok(())
    }

    /// Read a whole text file after checking it is readable
    pub fn read_text(path: &Path) -> Result<String> {
        Self::check_file_readable(path)?;
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests;
