//! CLI argument parsing module
//!
//! This module handles command-line argument parsing and the application
//! entry point. Every command opens the storage database, runs the pending
//! migration and then acts through a [`ProfileManager`].

use crate::config::{Config, OutputConfig, EXPORT_FILE_NAME};
use crate::confirm::{AssumeYes, Confirm, StdinConfirm};
use crate::cookies::{CookieManager, FileCookieJar};
use crate::error::ProfileError;
use crate::exit_code::exit_code_for_error;
use crate::manager::{Outcome, ProfileManager};
use crate::migration::{MigrationOutcome, MigrationRunner};
use crate::output::{format_names, format_profile, OutputWriter};
use crate::profile::{ProfileStore, SaveOutcome};
use crate::storage::{SqliteDatabase, StorageArea, StorageAreaKind, StorageQuota};
use crate::utils::{FileUtils, UrlUtils};
use crate::{i18n, logging};
use anyhow::Context;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::sync::Arc;

/// Main entry point for the CLI application
pub fn run() {
    let matches = create_app().get_matches();
    logging::init(matches.get_flag("verbose"));

    if let Err(err) = run_with_args(&matches) {
        let writer = OutputWriter::new(OutputConfig::default());
        let code = match err.downcast_ref::<ProfileError>() {
            Some(profile_err) => {
                let _ = writer.write_error(&i18n::localize_error(profile_err));
                exit_code_for_error(profile_err)
            }
            None => {
                let _ = writer.write_error(&format!("{:#}", err));
                1
            }
        };
        std::process::exit(code);
    }
}

/// Run with parsed command line arguments
fn run_with_args(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = build_config_from_args(matches)?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    rt.block_on(dispatch(&config, matches))
}

/// Create the CLI application structure
pub fn create_app() -> Command {
    Command::new("cookie-profiles")
        .version(crate::VERSION)
        .about("Save, switch and share named sets of site cookies")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("FILE")
                .env("COOKIE_PROFILES_DB")
                .global(true)
                .help("SQLite file holding the profile storage"),
        )
        .arg(
            Arg::new("jar")
                .long("jar")
                .value_name("FILE")
                .env("COOKIE_PROFILES_JAR")
                .global(true)
                .help("JSON cookie jar that pages are read from and written to"),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Answer yes to every confirmation"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Verbose output"),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Silent mode"),
        )
        .subcommand(
            Command::new("list")
                .about("List profile names")
                .arg(Arg::new("filter").help("Case-insensitive substring filter")),
        )
        .subcommand(
            Command::new("show")
                .about("Show the cookies of a profile")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("header")
                .about("Print a profile as a Cookie header value")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("save")
                .about("Save a profile from a cookie string or a page")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("from-string")
                        .long("from-string")
                        .value_name("COOKIES")
                        .help("Cookie string such as \"a=1; b=2\""),
                )
                .arg(
                    Arg::new("from-page")
                        .long("from-page")
                        .value_name("URL")
                        .help("Capture the cookies currently set for a page"),
                )
                .group(
                    ArgGroup::new("source")
                        .args(["from-string", "from-page"])
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Remove cookies from a saved profile")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("remove")
                        .long("remove")
                        .value_name("COOKIE")
                        .required(true)
                        .action(ArgAction::Append)
                        .help("Name of a cookie to drop"),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a profile")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("apply")
                .about("Replace a page's cookies with a profile")
                .arg(Arg::new("name").required(true))
                .arg(url_arg()),
        )
        .subcommand(
            Command::new("clear")
                .about("Remove every cookie of a page")
                .arg(url_arg()),
        )
        .subcommand(
            Command::new("export")
                .about("Export profiles as JSON")
                .arg(
                    Arg::new("names")
                        .num_args(1..)
                        .help("Profiles to export"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Export every stored profile"),
                )
                .group(
                    ArgGroup::new("selection")
                        .args(["names", "all"])
                        .required(true),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .default_value(EXPORT_FILE_NAME)
                        .help("Write the export to FILE; '-' for stdout"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Merge profiles from an export file")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(Command::new("migrate").about("Upgrade legacy profile storage"))
        .subcommand(Command::new("repair").about("Reconcile the profile index with the records"))
}

fn url_arg() -> Arg {
    Arg::new("url")
        .long("url")
        .value_name("URL")
        .required(true)
        .help("Page whose cookies are changed")
}

/// Build configuration from command line arguments
pub fn build_config_from_args(matches: &ArgMatches) -> crate::Result<Config> {
    let mut config = Config::default();

    if let Some(db) = matches.get_one::<String>("db") {
        config.database = FileUtils::expand_path(db)?;
    }
    if let Some(jar) = matches.get_one::<String>("jar") {
        config.jar = FileUtils::expand_path(jar)?;
    }

    config.assume_yes = matches.get_flag("yes");
    config.output.verbose = matches.get_flag("verbose");
    config.output.silent = matches.get_flag("silent");

    if let Some(("export", sub)) = matches.subcommand() {
        match sub.get_one::<String>("output").map(String::as_str) {
            Some("-") | None => {}
            Some(path) => config.output.file = Some(FileUtils::expand_path(path)?),
        }
    }

    Ok(config)
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or_default()
}

async fn dispatch(config: &Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let db = SqliteDatabase::open(&config.database)
        .with_context(|| format!("Failed to open {}", config.database.display()))?;
    let sync: Arc<dyn StorageArea> = Arc::new(db.area(StorageAreaKind::Sync, config.sync_quota));
    let local: Arc<dyn StorageArea> =
        Arc::new(db.area(StorageAreaKind::Local, StorageQuota::unlimited()));

    let migration = MigrationRunner::new(sync.clone(), local).run().await?;
    if let MigrationOutcome::Migrated { profiles } = migration {
        log::info!("migrated {} legacy profile(s)", profiles);
    }

    let jar: Arc<dyn CookieManager> = Arc::new(FileCookieJar::open(&config.jar)?);
    let confirm: Box<dyn Confirm> = if config.assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    };
    let mut manager = ProfileManager::new(ProfileStore::new(sync), jar, confirm);
    let writer = OutputWriter::new(OutputConfig {
        file: None,
        ..config.output.clone()
    });
    writer.write_verbose(&format!("storage: {}", config.database.display()))?;

    match matches.subcommand() {
        Some(("list", sub)) => {
            let filter = sub
                .get_one::<String>("filter")
                .map(String::as_str)
                .unwrap_or_default();
            let names = manager.list(filter).await?;
            if names.is_empty() && filter.is_empty() {
                writer.write_status(&i18n::message("profiles-empty", &[]))?;
            } else {
                writer.write(&format_names(&names))?;
            }
        }
        Some(("show", sub)) => {
            let profile = manager.store().get(required(sub, "name")).await?;
            writer.write(&format_profile(&profile))?;
        }
        Some(("header", sub)) => {
            manager.load_profile(required(sub, "name")).await?;
            writer.write(&format!("{}\n", manager.cookie_string()))?;
        }
        Some(("save", sub)) => {
            let name = required(sub, "name");
            let outcome = match (
                sub.get_one::<String>("from-string"),
                sub.get_one::<String>("from-page"),
            ) {
                (Some(cookies), _) => manager.save_from_string(name, cookies).await?,
                (None, Some(url)) => {
                    manager.set_page(url)?;
                    let captured = manager.capture_page().await?.len();
                    writer.write_verbose(&format!("captured {} cookie(s)", captured))?;
                    manager.save_as(name).await?
                }
                (None, None) => {
                    return Err(ProfileError::InvalidInput(
                        "give --from-string or --from-page".to_string(),
                    )
                    .into())
                }
            };
            match outcome {
                Outcome::Done(SaveOutcome::Created(profile)) => writer.write_status(
                    &i18n::message("profile-created", &[("name", profile.name)]),
                )?,
                Outcome::Done(SaveOutcome::Overwritten(profile)) => writer.write_status(
                    &i18n::message("profile-overwritten", &[("name", profile.name)]),
                )?,
                Outcome::Declined => {
                    writer.write_status(&i18n::message("operation-cancelled", &[]))?
                }
            }
        }
        Some(("edit", sub)) => {
            let name = required(sub, "name");
            manager.load_profile(name).await?;
            for cookie in sub.get_many::<String>("remove").into_iter().flatten() {
                if !manager.remove_cookie(cookie) {
                    log::warn!("profile '{}' has no cookie '{}'", name, cookie);
                }
            }
            let profile = manager.save_edited().await?;
            writer.write_status(&i18n::message("profile-edited", &[("name", profile.name)]))?;
        }
        Some(("delete", sub)) => {
            let name = required(sub, "name");
            match manager.delete_profile(name).await? {
                Outcome::Done(()) => writer
                    .write_status(&i18n::message("profile-deleted", &[("name", name.to_string())]))?,
                Outcome::Declined => {
                    writer.write_status(&i18n::message("operation-cancelled", &[]))?
                }
            }
        }
        Some(("apply", sub)) => {
            let host = UrlUtils::display_host(manager.set_page(required(sub, "url"))?);
            let report = manager.load_profile(required(sub, "name")).await?;
            let applied = report.applied.unwrap_or_default();
            writer.write_status(&i18n::message(
                "profile-applied",
                &[
                    ("name", report.profile.name),
                    ("host", host),
                    ("applied", applied.applied.to_string()),
                    ("skipped", applied.skipped.len().to_string()),
                ],
            ))?;
        }
        Some(("clear", sub)) => {
            let host = UrlUtils::display_host(manager.set_page(required(sub, "url"))?);
            match manager.clear_page().await? {
                Outcome::Done(count) => writer.write_status(&i18n::message(
                    "page-cleared",
                    &[("count", count.to_string()), ("host", host)],
                ))?,
                Outcome::Declined => {
                    writer.write_status(&i18n::message("operation-cancelled", &[]))?
                }
            }
        }
        Some(("export", sub)) => {
            let names: Vec<String> = if sub.get_flag("all") {
                manager.list("").await?
            } else {
                sub.get_many::<String>("names")
                    .into_iter()
                    .flatten()
                    .cloned()
                    .collect()
            };
            let (bundle, json) = manager.export_profiles(&names).await?;
            let export = OutputWriter::new(config.output.clone());
            match &export.config().file {
                Some(path) => {
                    export
                        .write(&json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    writer.write_status(&i18n::message(
                        "profiles-exported",
                        &[
                            ("count", bundle.len().to_string()),
                            ("path", path.display().to_string()),
                        ],
                    ))?;
                }
                None => export.write(&format!("{}\n", json))?,
            }
        }
        Some(("import", sub)) => {
            let path = FileUtils::expand_path(required(sub, "file"))?;
            let json = FileUtils::read_text(&path)?;
            match manager.import_profiles(&json).await? {
                Outcome::Done(report) => writer.write_status(&i18n::message(
                    "profiles-imported",
                    &[
                        ("created", report.created.len().to_string()),
                        ("updated", report.updated.len().to_string()),
                    ],
                ))?,
                Outcome::Declined => {
                    writer.write_status(&i18n::message("operation-cancelled", &[]))?
                }
            }
        }
        Some(("migrate", _)) => match migration {
            MigrationOutcome::Migrated { profiles } => writer.write_status(&i18n::message(
                "migration-done",
                &[("count", profiles.to_string())],
            ))?,
            MigrationOutcome::AlreadyMigrated => {
                writer.write_status(&i18n::message("migration-skipped", &[]))?
            }
        },
        Some(("repair", _)) => {
            let report = manager.store().repair().await?;
            if report.is_clean() {
                writer.write_status(&i18n::message("repair-clean", &[]))?;
            } else {
                writer.write_status(&i18n::message(
                    "repair-done",
                    &[
                        ("dropped", report.dropped.len().to_string()),
                        ("adopted", report.adopted.len().to_string()),
                    ],
                ))?;
            }
        }
        _ => {
            return Err(ProfileError::InvalidInput("unknown command".to_string()).into());
        }
    }

    Ok(())
}
