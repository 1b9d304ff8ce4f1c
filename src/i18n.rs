use crate::error::ProfileError;
use fluent_templates::fluent_bundle::FluentValue;
use fluent_templates::{static_loader, Loader};
use std::collections::HashMap;
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "locales",
        fallback_language: "en-US",
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

pub fn localize_error(err: &ProfileError) -> String {
    let langid = resolve_language();
    match err {
        ProfileError::NotFound(detail) => message_with_detail(&langid, "error-not-found", detail),
        ProfileError::QuotaExceeded { .. } => {
            message_with_detail(&langid, "error-quota", &err.to_string())
        }
        ProfileError::Storage(detail) => message_with_detail(&langid, "error-storage", detail),
        ProfileError::DomainRejected(detail) => message_with_detail(&langid, "error-domain", detail),
        ProfileError::CookieRejected(detail) => message_with_detail(&langid, "error-cookie", detail),
        ProfileError::MalformedImport(detail) => {
            message_with_detail(&langid, "error-malformed-import", detail)
        }
        ProfileError::InvalidInput(detail) => {
            message_with_detail(&langid, "error-invalid-input", detail)
        }
        ProfileError::InvalidUrl(detail) => message_with_detail(&langid, "error-invalid-url", detail),
        ProfileError::Io(detail) => message_with_detail(&langid, "error-io", &detail.to_string()),
        ProfileError::Json(detail) => message_with_detail(&langid, "error-json", &detail.to_string()),
        ProfileError::Database(detail) => {
            message_with_detail(&langid, "error-database", &detail.to_string())
        }
        ProfileError::Config(detail) => message_with_detail(&langid, "error-config", detail),
        ProfileError::FileNotFound(detail) => {
            message_with_detail(&langid, "error-file-not-found", detail)
        }
        ProfileError::PermissionDenied(detail) => {
            message_with_detail(&langid, "error-permission-denied", detail)
        }
    }
}

/// Look up a user-facing message, filling in `args`.
pub fn message(key: &str, args: &[(&str, String)]) -> String {
    let langid = resolve_language();
    if args.is_empty() {
        return LOCALES.lookup(&langid, key);
    }
    let args: HashMap<&str, FluentValue> = args
        .iter()
        .map(|(name, value)| (*name, FluentValue::from(value.clone())))
        .collect();
    LOCALES.lookup_with_args(&langid, key, &args)
}

fn message_with_detail(langid: &LanguageIdentifier, key: &str, detail: &str) -> String {
    let mut args = HashMap::new();
    args.insert("detail", FluentValue::from(detail));
    LOCALES.lookup_with_args(langid, key, &args)
}

fn resolve_language() -> LanguageIdentifier {
    for key in ["LC_ALL", "LC_MESSAGES", "LANG"] {
        if let Ok(value) = std::env::var(key) {
            if let Some(lang) = normalize_lang(value) {
                if let Ok(langid) = lang.parse::<LanguageIdentifier>() {
                    return langid;
                }
            }
        }
    }
    "en-US".parse().expect("valid fallback language")
}

fn normalize_lang(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "C" || value == "POSIX" {
        return None;
    }
    let value = value.split('.').next().unwrap_or(value);
    let value = value.replace('_', "-");
    Some(value)
}
