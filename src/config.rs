use std::{env, path::PathBuf};

use chrono_tz::Tz;
use url::Url;

use crate::errors::ConfigError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";
pub const DEFAULT_CAPABILITY: &str = "manage_options";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    MySql(String),
    Snapshot(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub port: u16,
    pub backend: Backend,
    pub table_prefix: String,
    pub timezone: Tz,
    pub site_url: Option<Url>,
    pub login_url: Option<Url>,
    pub required_capability: String,
}

impl ReportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match var("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            None => DEFAULT_PORT,
        };

        let backend = if let Some(url) = var("DATABASE_URL") {
            Backend::MySql(url)
        } else if let Some(path) = var("REPORT_SNAPSHOT_PATH") {
            Backend::Snapshot(PathBuf::from(path))
        } else {
            return Err(ConfigError::MissingBackend);
        };

        let table_prefix = lookup("TABLE_PREFIX").unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string());
        if !table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidPrefix(table_prefix));
        }

        let timezone = match var("REPORT_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(name))?,
            None => Tz::UTC,
        };

        Ok(Self {
            port,
            backend,
            table_prefix,
            timezone,
            site_url: parse_url("SITE_URL", var("SITE_URL"))?,
            login_url: parse_url("LOGIN_URL", var("LOGIN_URL"))?,
            required_capability: var("REQUIRED_CAPABILITY")
                .unwrap_or_else(|| DEFAULT_CAPABILITY.to_string()),
        })
    }
}

fn parse_url(var: &'static str, value: Option<String>) -> Result<Option<Url>, ConfigError> {
    value
        .map(|value| {
            Url::parse(value.trim())
                .ok()
                .filter(|url| url.has_host())
                .ok_or(ConfigError::InvalidUrl { var, value })
        })
        .transpose()
}
