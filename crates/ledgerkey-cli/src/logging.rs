// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "LEDGERKEY_LOG";

/// Routes `tracing` output to `path`. The terminal belongs to the entry
/// screen, so nothing is written to stdout or stderr.
pub fn init(path: &Path, default_filter: &str) -> Result<()> {
    let file = open_log_file(path)?;
    let filter = resolve_filter(std::env::var(LOG_ENV).ok().as_deref(), default_filter)?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("install log subscriber")?;

    tracing::info!(log = %path.display(), "logging initialized");
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- set [logging].file to a writable path",
                path.display()
            )
        })
}

/// `LEDGERKEY_LOG` wins over the configured filter when it is set and non-empty.
fn resolve_filter(env_value: Option<&str>, default_filter: &str) -> Result<EnvFilter> {
    match env_value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV} filter {directives:?}")),
        None => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid [logging].filter {default_filter:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{open_log_file, resolve_filter};
    use anyhow::Result;
    use std::io::Write;

    #[test]
    fn env_filter_overrides_config() -> Result<()> {
        let filter = resolve_filter(Some("ledgerkey_app=trace"), "info")?;
        assert_eq!(filter.to_string(), "ledgerkey_app=trace");
        Ok(())
    }

    #[test]
    fn blank_env_falls_back_to_config() -> Result<()> {
        let filter = resolve_filter(Some("  "), "warn")?;
        assert_eq!(filter.to_string(), "warn");
        let filter = resolve_filter(None, "debug")?;
        assert_eq!(filter.to_string(), "debug");
        Ok(())
    }

    #[test]
    fn open_log_file_creates_parent_and_appends() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("ledgerkey.log");

        open_log_file(&path)?.write_all(b"first\n")?;
        open_log_file(&path)?.write_all(b"second\n")?;

        assert_eq!(std::fs::read_to_string(&path)?, "first\nsecond\n");
        Ok(())
    }
}
