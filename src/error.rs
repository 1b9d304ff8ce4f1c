//! Error handling for cookie-profiles

use thiserror::Error;

/// Main error type for profile store operations
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Storage quota exceeded for '{key}': {size} bytes exceeds limit of {limit}")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("Storage write failed: {0}")]
    Storage(String),

    #[error("Cookie domain rejected: {0}")]
    DomainRejected(String),

    #[error("Cookie could not be set: {0}")]
    CookieRejected(String),

    #[error("Malformed import file: {0}")]
    MalformedImport(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl ProfileError {
    /// Whether a cookie manager rejected a cookie because of its `domain` attribute.
    pub fn is_domain_error(&self) -> bool {
        match self {
            ProfileError::DomainRejected(_) => true,
            ProfileError::CookieRejected(message) => message.to_lowercase().contains("domain"),
            _ => false,
        }
    }
}

/// Result type alias for profile store operations
pub type Result<T> = std::result::Result<T, ProfileError>;
