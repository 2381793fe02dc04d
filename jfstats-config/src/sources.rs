use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::loader::ConfigLoadError;

/// Raw configuration as written in `jfstats.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub jellyfin: FileJellyfinConfig,
    #[serde(default)]
    pub sync: FileSyncConfig,
    #[serde(default)]
    pub import: FileImportConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileDatabaseConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileJellyfinConfig {
    #[serde(default, with = "humantime_opt")]
    pub request_timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileSyncConfig {
    #[serde(default, with = "humantime_opt")]
    pub stuck_threshold: Option<Duration>,
    #[serde(default, with = "humantime_opt")]
    pub sweep_interval: Option<Duration>,
    #[serde(default, with = "humantime_opt")]
    pub live_poll_interval: Option<Duration>,
    #[serde(default, with = "humantime_opt")]
    pub recent_activity_interval: Option<Duration>,
    pub item_page_size: Option<u32>,
    pub activity_page_size: Option<u32>,
    pub recent_activity_pages: Option<u32>,
    pub workers: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileImportConfig {
    pub max_upload_bytes: Option<u64>,
    pub channel_capacity: Option<usize>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub database_url: Option<String>,
    pub pg_host: Option<String>,
    pub pg_port: Option<u16>,
    pub pg_user: Option<String>,
    pub pg_password: Option<String>,
    pub pg_database: Option<String>,
    pub db_max_connections: Option<u32>,
    pub jellyfin_request_timeout: Option<Duration>,
    pub sync_stuck_threshold: Option<Duration>,
    pub sync_live_poll_interval: Option<Duration>,
    pub sync_recent_activity_interval: Option<Duration>,
    pub sync_sweep_interval: Option<Duration>,
    pub sync_workers: Option<usize>,
    pub import_max_upload_bytes: Option<u64>,
}

impl EnvConfig {
    /// Reads the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            config_path: text("JFSTATS_CONFIG").map(PathBuf::from),
            server_host: text("SERVER_HOST"),
            server_port: parse_number("SERVER_PORT", text("SERVER_PORT"))?,
            database_url: text("DATABASE_URL"),
            pg_host: text("PGHOST"),
            pg_port: parse_number("PGPORT", text("PGPORT"))?,
            pg_user: text("PGUSER"),
            pg_password: text("PGPASSWORD"),
            pg_database: text("PGDATABASE"),
            db_max_connections: parse_number(
                "DB_MAX_CONNECTIONS",
                text("DB_MAX_CONNECTIONS"),
            )?,
            jellyfin_request_timeout: parse_duration(
                "JELLYFIN_REQUEST_TIMEOUT",
                text("JELLYFIN_REQUEST_TIMEOUT"),
            )?,
            sync_stuck_threshold: parse_duration(
                "SYNC_STUCK_THRESHOLD",
                text("SYNC_STUCK_THRESHOLD"),
            )?,
            sync_live_poll_interval: parse_duration(
                "SYNC_LIVE_POLL_INTERVAL",
                text("SYNC_LIVE_POLL_INTERVAL"),
            )?,
            sync_recent_activity_interval: parse_duration(
                "SYNC_RECENT_ACTIVITY_INTERVAL",
                text("SYNC_RECENT_ACTIVITY_INTERVAL"),
            )?,
            sync_sweep_interval: parse_duration(
                "SYNC_SWEEP_INTERVAL",
                text("SYNC_SWEEP_INTERVAL"),
            )?,
            sync_workers: parse_number("SYNC_WORKERS", text("SYNC_WORKERS"))?,
            import_max_upload_bytes: parse_number(
                "IMPORT_MAX_UPLOAD_BYTES",
                text("IMPORT_MAX_UPLOAD_BYTES"),
            )?,
        })
    }
}

fn parse_number<T>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|err| ConfigLoadError::InvalidValue {
                key,
                value: value.clone(),
                reason: err.to_string(),
            })
    })
    .transpose()
}

fn parse_duration(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<Duration>, ConfigLoadError> {
    raw.map(|value| {
        humantime::parse_duration(value.trim()).map_err(|err| ConfigLoadError::InvalidValue {
            key,
            value: value.clone(),
            reason: err.to_string(),
        })
    })
    .transpose()
}

/// Durations written either as humantime strings (`"15m"`) or whole seconds.
mod humantime_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
            Some(Raw::Text(text)) => humantime::parse_duration(text.trim())
                .map(Some)
                .map_err(|err| D::Error::custom(format!("invalid duration `{text}`: {err}"))),
        }
    }
}
