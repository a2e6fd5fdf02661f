// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use ledgerkey_app::{VoucherKind, WorkingPeriod};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "ledgerkey";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:9000/api";
const DEFAULT_TIMEOUT: &str = "5s";
const DEFAULT_MIN_ROWS: usize = 2;
const MAX_MIN_ROWS: usize = 50;
const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub entry: Entry,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            entry: Entry::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    pub default_voucher: Option<String>,
    pub min_rows: Option<usize>,
    /// `YYYY-MM-DD..YYYY-MM-DD`; unset means the fiscal year holding today.
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub filter: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("LEDGERKEY_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set LEDGERKEY_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no `version`. Add `version = 1` at the top and keep values under [server], [entry], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.server.base_url
            && base_url.trim().is_empty()
        {
            bail!("server.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.server.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "server.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(voucher) = &self.entry.default_voucher
            && VoucherKind::parse(voucher).is_none()
        {
            let known = VoucherKind::ALL.map(VoucherKind::as_str).join(", ");
            bail!(
                "entry.default_voucher {voucher:?} in {} is not a voucher type; use one of: {known}",
                path.display()
            );
        }

        if let Some(min_rows) = self.entry.min_rows
            && !(1..=MAX_MIN_ROWS).contains(&min_rows)
        {
            bail!(
                "entry.min_rows in {} must be between 1 and {MAX_MIN_ROWS}, got {min_rows}",
                path.display()
            );
        }

        if let Some(period) = &self.entry.period {
            WorkingPeriod::parse(period)
                .with_context(|| format!("entry.period in {}", path.display()))?;
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn default_voucher(&self) -> VoucherKind {
        self.entry
            .default_voucher
            .as_deref()
            .and_then(VoucherKind::parse)
            .unwrap_or(VoucherKind::Payment)
    }

    pub fn min_rows(&self) -> usize {
        self.entry.min_rows.unwrap_or(DEFAULT_MIN_ROWS)
    }

    pub fn period(&self, today: time::Date) -> Result<WorkingPeriod> {
        match &self.entry.period {
            Some(raw) => WorkingPeriod::parse(raw),
            None => WorkingPeriod::fiscal_year_containing(today),
        }
    }

    pub fn log_filter(&self) -> &str {
        self.logging
            .filter
            .as_deref()
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(file) = &self.logging.file {
            return Ok(PathBuf::from(file));
        }
        let root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| {
                anyhow!("cannot resolve a log directory; set [logging].file in the config")
            })?;
        Ok(root.join(APP_NAME).join("ledgerkey.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# ledgerkey config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[entry]\n# contra, payment, receipt, journal, sales, purchase, credit_note, debit_note\ndefault_voucher = \"payment\"\nmin_rows = {}\n# Optional. Default is the April-March fiscal year holding today.\n# period = \"2026-04-01..2027-03-31\"\n\n[logging]\n# Overridden by LEDGERKEY_LOG when set.\nfilter = \"{}\"\n# Optional. Default is the platform state dir (for example ~/.local/state/ledgerkey/ledgerkey.log)\n# file = \"/absolute/path/to/ledgerkey.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_MIN_ROWS,
            DEFAULT_LOG_FILTER,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .with_context(|| format!("timeout {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
