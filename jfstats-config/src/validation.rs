use crate::loader::ConfigLoadError;
use crate::models::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

/// Non-fatal findings; the binary logs them at startup.
#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    require_positive("sync.workers", config.sync.workers as u64)?;
    require_positive("sync.item_page_size", u64::from(config.sync.item_page_size))?;
    require_positive("sync.activity_page_size", u64::from(config.sync.activity_page_size))?;
    require_positive("import.channel_capacity", config.import.channel_capacity as u64)?;
    require_positive("import.max_upload_bytes", config.import.max_upload_bytes)?;
    require_positive("database.max_connections", u64::from(config.database.max_connections))?;

    if config.sync.sweep_interval > config.sync.stuck_threshold {
        warnings.push_with_hint(
            "sync.sweep_interval is longer than sync.stuck_threshold; stuck servers stay blocked until the next sweep",
            "Lower SYNC_SWEEP_INTERVAL or raise SYNC_STUCK_THRESHOLD",
        );
    }

    if config.sync.live_poll_interval.as_secs() < 1 {
        warnings.push(
            "sync.live_poll_interval is below one second; every configured server is polled that often",
        );
    }

    if (config.sync.workers as u32) > config.database.max_connections {
        warnings.push_with_hint(
            format!(
                "{} sync workers share {} database connections",
                config.sync.workers, config.database.max_connections
            ),
            "Raise DB_MAX_CONNECTIONS to at least SYNC_WORKERS",
        );
    }

    Ok(warnings)
}

fn require_positive(key: &'static str, value: u64) -> Result<(), ConfigLoadError> {
    if value == 0 {
        return Err(ConfigLoadError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}
