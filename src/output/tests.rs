use super::{format_names, format_profile, OutputWriter};
use crate::config::OutputConfig;
use crate::profile::{Cookie, Profile, SameSite};
use tempfile::tempdir;

#[test]
fn write_goes_to_configured_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("export.json");
    let writer = OutputWriter::new(OutputConfig {
        file: Some(path.clone()),
        ..OutputConfig::default()
    });

    writer.write("{\n  \"A\": []\n}").expect("write");
    let written = std::fs::read_to_string(&path).expect("read back");
    assert_eq!(written, "{\n  \"A\": []\n}");
}

#[test]
fn silent_writer_still_writes_files() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("out.txt");
    let writer = OutputWriter::new(OutputConfig {
        file: Some(path.clone()),
        verbose: true,
        silent: true,
    });

    writer.write_status("ignored").expect("status");
    writer.write_verbose("ignored").expect("verbose");
    writer.write("kept").expect("write");
    assert_eq!(std::fs::read_to_string(&path).expect("read"), "kept");
}

#[test]
fn names_are_listed_one_per_line() {
    let names = vec!["Alpha".to_string(), "beta".to_string()];
    assert_eq!(format_names(&names), "Alpha\nbeta\n");
    assert_eq!(format_names(&[]), "");
}

#[test]
fn profile_table_shows_flags() {
    let mut secure = Cookie::new("sid", "abc");
    secure.domain = Some("example.com".to_string());
    secure.secure = Some(true);
    secure.http_only = Some(true);
    secure.same_site = Some(SameSite::Lax);
    secure.expiration_date = Some(1_900_000_000.5);

    let profile = Profile::new("work", vec![secure, Cookie::new("theme", "dark")]);
    let table = format_profile(&profile);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(
        lines[0],
        "sid\tabc\texample.com\t/\tsecure,httponly,samesite=lax,expires=1900000000"
    );
    assert_eq!(lines[1], "theme\tdark\t-\t/\tsession");
}
