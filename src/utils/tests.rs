use super::{FileUtils, UrlUtils};
use crate::error::ProfileError;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn validate_url_adds_scheme() {
    let url = UrlUtils::validate_url("example.com").expect("valid url");
    assert_eq!(url.scheme(), "http");
    assert_eq!(url.host_str(), Some("example.com"));
}

#[test]
fn validate_url_rejects_invalid_input() {
    let err = UrlUtils::validate_url("http://").expect_err("invalid url");
    assert!(matches!(err, ProfileError::InvalidUrl(_)));
}

#[test]
fn display_host_includes_explicit_port() {
    let url = UrlUtils::validate_url("http://localhost:8080/app").expect("valid url");
    assert_eq!(UrlUtils::display_host(&url), "localhost:8080");
    let url = UrlUtils::validate_url("https://example.com/").expect("valid url");
    assert_eq!(UrlUtils::display_host(&url), "example.com");
}

#[test]
fn expand_path_expands_home() {
    let home = dirs::home_dir().expect("home dir");
    let path = FileUtils::expand_path("~/cookie-profiles-test").expect("expanded");
    assert_eq!(path, home.join("cookie-profiles-test"));
}

#[test]
fn expand_path_leaves_non_tilde_unchanged() {
    let path = FileUtils::expand_path("/tmp/cookie-profiles").expect("expanded");
    assert_eq!(path, PathBuf::from("/tmp/cookie-profiles"));
    let path = FileUtils::expand_path("~user/file").expect("expanded");
    assert_eq!(path, PathBuf::from("~user/file"));
}

#[test]
fn check_file_readable_validates_paths() {
    let temp = tempdir().expect("tempdir");
    let file_path = temp.path().join("profiles.json");
    fs::write(&file_path, "{}").expect("write file");
    FileUtils::check_file_readable(&file_path).expect("readable file");
    assert_eq!(FileUtils::read_text(&file_path).expect("read"), "{}");

    let err =
        FileUtils::check_file_readable(&temp.path().join("missing")).expect_err("missing file");
    assert!(matches!(err, ProfileError::FileNotFound(_)));

    let err = FileUtils::check_file_readable(temp.path()).expect_err("dir path");
    assert!(matches!(err, ProfileError::Config(_)));
}
