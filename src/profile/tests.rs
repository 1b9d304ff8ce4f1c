use super::{cookie_header, parse_cookie_string, Cookie, Profile, ProfileBundle, SameSite};
use crate::error::ProfileError;
use serde_json::json;

#[test]
fn cookie_uses_browser_field_names() {
    let mut cookie = Cookie::new("sid", "abc");
    cookie.http_only = Some(true);
    cookie.same_site = Some(SameSite::NoRestriction);
    cookie.expiration_date = Some(1_900_000_000.5);

    let value = serde_json::to_value(&cookie).expect("serialize");
    assert_eq!(
        value,
        json!({
            "name": "sid",
            "value": "abc",
            "path": "/",
            "httpOnly": true,
            "sameSite": "no_restriction",
            "expirationDate": 1_900_000_000.5
        })
    );
}

#[test]
fn cookie_defaults_path_when_missing() {
    let cookie: Cookie = serde_json::from_value(json!({"name": "a", "value": "1"})).expect("parse");
    assert_eq!(cookie.path, "/");
    assert!(cookie.is_session());
}

#[test]
fn cookie_with_expiration_is_persistent_unless_flagged() {
    let mut cookie = Cookie::new("a", "1");
    cookie.expiration_date = Some(10.0);
    assert!(!cookie.is_session());
    cookie.session = Some(true);
    assert!(cookie.is_session());
}

#[test]
fn same_site_parses_browser_and_header_spellings() {
    assert_eq!("none".parse::<SameSite>(), Ok(SameSite::NoRestriction));
    assert_eq!("Lax".parse::<SameSite>(), Ok(SameSite::Lax));
    assert!("sometimes".parse::<SameSite>().is_err());
    assert_eq!(SameSite::Strict.to_string(), "strict");
}

#[test]
fn parse_cookie_string_keeps_well_formed_pairs() {
    let cookies = parse_cookie_string(" a = 1 ; broken; b=2;c=3=4; =5; d=");
    let pairs: Vec<(&str, &str)> = cookies
        .iter()
        .map(|c| (c.name.as_str(), c.value.as_str()))
        .collect();
    assert_eq!(pairs, vec![("a", "1"), ("b", "2"), ("d", "")]);
}

#[test]
fn cookie_header_joins_pairs() {
    let cookies = vec![Cookie::new("a", "1"), Cookie::new("b", "2")];
    assert_eq!(cookie_header(&cookies), "a=1; b=2");
    assert_eq!(cookie_header(&[]), "");
}

#[test]
fn bundle_preserves_json_order() {
    let bundle = ProfileBundle::from_json(r#"{"zeta": [], "alpha": [{"name": "a", "value": "1"}]}"#)
        .expect("parse");
    assert_eq!(bundle.names(), vec!["zeta", "alpha"]);
    assert_eq!(bundle.get("alpha").map(|p| p.cookies.len()), Some(1));
}

#[test]
fn bundle_rejects_non_json_and_wrong_shape() {
    let err = ProfileBundle::from_json("{not json").expect_err("syntax");
    assert!(matches!(err, ProfileError::MalformedImport(_)));

    let err = ProfileBundle::from_json("[1, 2]").expect_err("array");
    assert!(matches!(err, ProfileError::MalformedImport(_)));

    let err = ProfileBundle::from_json(r#"{"a": "not a list"}"#).expect_err("cookies");
    assert!(matches!(err, ProfileError::MalformedImport(_)));
}

#[test]
fn bundle_insert_replaces_in_place() {
    let mut bundle = ProfileBundle::new();
    bundle.insert(Profile::new("a", vec![Cookie::new("x", "1")]));
    bundle.insert(Profile::new("b", vec![]));
    bundle.insert(Profile::new("a", vec![Cookie::new("y", "2")]));

    assert_eq!(bundle.names(), vec!["a", "b"]);
    assert_eq!(bundle.get("a").map(|p| p.cookies[0].name.as_str()), Some("y"));
    assert!(bundle.get("b").map(|p| p.cookies.is_empty()).unwrap_or(false));
}

#[test]
fn bundle_pretty_json_is_indented_object() {
    let bundle: ProfileBundle = vec![Profile::new("a", vec![Cookie::new("x", "1")])]
        .into_iter()
        .collect();
    let text = bundle.to_json_pretty().expect("json");
    assert!(text.starts_with("{\n  \"a\": [\n"));
    assert_eq!(ProfileBundle::from_json(&text).expect("reparse"), bundle);
}
