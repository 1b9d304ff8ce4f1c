//! Output formatting and display utilities

use crate::config::OutputConfig;
use crate::error::Result;
use crate::profile::Profile;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Output writer that handles file vs stdout
pub struct OutputWriter {
    config: OutputConfig,
}

impl OutputWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Write content to configured output
    pub fn write(&self, content: &str) -> Result<()> {
        if let Some(file_path) = &self.config.file {
            self.write_to_file(content, file_path)
        } else {
            self.write_to_stdout(content)
        }
    }

    /// Write a status line to stdout unless silenced
    pub fn write_status(&self, message: &str) -> Result<()> {
        if !self.config.silent {
            self.write_to_stdout(&format!("{}\n", message))?;
        }
        Ok(())
    }

    /// Write verbose information (if enabled)
    pub fn write_verbose(&self, message: &str) -> Result<()> {
        if self.config.verbose && !self.config.silent {
            eprintln!("* {}", message);
        }
        Ok(())
    }

    /// Write error message
    pub fn write_error(&self, message: &str) -> Result<()> {
        if !self.config.silent {
            eprintln!("cookie-profiles: error: {}", message);
        }
        Ok(())
    }

    fn write_to_file(&self, content: &str, file_path: &Path) -> Result<()> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(file_path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_to_stdout(&self, content: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// One line per profile name.
pub fn format_names(names: &[String]) -> String {
    names.iter().map(|name| format!("{}\n", name)).collect()
}

/// Tab-separated cookie table for `show`.
pub fn format_profile(profile: &Profile) -> String {
    let mut out = String::new();
    for cookie in &profile.cookies {
        let mut flags = Vec::new();
        if cookie.secure.unwrap_or(false) {
            flags.push("secure".to_string());
        }
        if cookie.http_only.unwrap_or(false) {
            flags.push("httponly".to_string());
        }
        if let Some(same_site) = cookie.same_site {
            flags.push(format!("samesite={}", same_site));
        }
        match cookie.expiration_date {
            Some(at) if !cookie.is_session() => flags.push(format!("expires={}", at as i64)),
            _ => flags.push("session".to_string()),
        }
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            cookie.name,
            cookie.value,
            cookie.domain.as_deref().unwrap_or("-"),
            cookie.path,
            flags.join(",")
        ));
    }
    out
}

#[cfg(test)]
mod tests;
