pub mod db_url;
mod error;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use tracing::debug;

pub use error::ConfigLoadError;

use crate::models::{
    Config, ConfigMetadata, DEFAULT_ACTIVITY_PAGE_SIZE, DEFAULT_CHANNEL_CAPACITY, DEFAULT_HOST,
    DEFAULT_ITEM_PAGE_SIZE, DEFAULT_LIVE_POLL_INTERVAL, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT, DEFAULT_RECENT_ACTIVITY_INTERVAL,
    DEFAULT_RECENT_ACTIVITY_PAGES, DEFAULT_REQUEST_TIMEOUT, DEFAULT_STUCK_THRESHOLD,
    DEFAULT_SWEEP_INTERVAL, DEFAULT_WORKERS, DatabaseConfig, ImportConfig, JellyfinConfig,
    ServerConfig, SyncConfig, default_user_agent,
};
use crate::sources::{EnvConfig, FileConfig};
use crate::validation::{self, ConfigWarnings};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("jfstats.toml"),
        PathBuf::from("config/jfstats.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Replaces the process environment; `.env` entries are merged into it
    /// instead of being exported.
    pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.options.env = Some(vars);
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let (env, env_file_loaded) = self.gather_env()?;
        let (file, config_path) = self.load_file_config(&env)?;

        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No jfstats.toml detected; using defaults and environment variables",
                "Create jfstats.toml or point JFSTATS_CONFIG at one",
            );
        }

        let config = compose(
            file,
            env,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )?;
        warnings.extend(validation::apply_guard_rails(&config)?);

        Ok(ConfigLoad { config, warnings })
    }

    fn gather_env(&self) -> Result<(EnvConfig, bool), ConfigLoadError> {
        match &self.options.env {
            Some(vars) => {
                let mut vars = vars.clone();
                let loaded = match &self.options.env_file {
                    Some(path) if path.exists() => {
                        for entry in dotenvy::from_path_iter(path)? {
                            let (key, value) = entry?;
                            vars.entry(key).or_insert(value);
                        }
                        true
                    }
                    _ => false,
                };
                Ok((EnvConfig::from_map(&vars)?, loaded))
            }
            None => {
                let loaded = match &self.options.env_file {
                    Some(path) => dotenvy::from_path(path).map(|_| true),
                    None => dotenvy::dotenv().map(|_| true),
                }
                .or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    other => Err(other),
                })?;
                Ok((EnvConfig::gather()?, loaded))
            }
        }
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(FileConfig, Option<PathBuf>), ConfigLoadError> {
        let requested = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match requested {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS.iter().find(|candidate| candidate.exists()) {
                Some(found) => found.clone(),
                None => return Ok((FileConfig::default(), None)),
            },
        };

        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let file = toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok((file, Some(path)))
    }
}

fn compose(
    file: FileConfig,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<Config, ConfigLoadError> {
    let url = db_url::resolve_database_url(&env, &file.database)?
        .ok_or(ConfigLoadError::MissingDatabaseUrl)?;

    let FileConfig {
        server: file_server,
        database: file_database,
        jellyfin: file_jellyfin,
        sync: file_sync,
        import: file_import,
    } = file;

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let database = DatabaseConfig {
        url,
        max_connections: env
            .db_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
    };

    let jellyfin = JellyfinConfig {
        request_timeout: env
            .jellyfin_request_timeout
            .or(file_jellyfin.request_timeout)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        user_agent: file_jellyfin.user_agent.unwrap_or_else(default_user_agent),
    };

    let sync = SyncConfig {
        stuck_threshold: env
            .sync_stuck_threshold
            .or(file_sync.stuck_threshold)
            .unwrap_or(DEFAULT_STUCK_THRESHOLD),
        sweep_interval: env
            .sync_sweep_interval
            .or(file_sync.sweep_interval)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL),
        live_poll_interval: env
            .sync_live_poll_interval
            .or(file_sync.live_poll_interval)
            .unwrap_or(DEFAULT_LIVE_POLL_INTERVAL),
        recent_activity_interval: env
            .sync_recent_activity_interval
            .or(file_sync.recent_activity_interval)
            .unwrap_or(DEFAULT_RECENT_ACTIVITY_INTERVAL),
        item_page_size: file_sync.item_page_size.unwrap_or(DEFAULT_ITEM_PAGE_SIZE),
        activity_page_size: file_sync
            .activity_page_size
            .unwrap_or(DEFAULT_ACTIVITY_PAGE_SIZE),
        recent_activity_pages: file_sync
            .recent_activity_pages
            .unwrap_or(DEFAULT_RECENT_ACTIVITY_PAGES),
        workers: env
            .sync_workers
            .or(file_sync.workers)
            .unwrap_or(DEFAULT_WORKERS),
    };

    let import = ImportConfig {
        max_upload_bytes: env
            .import_max_upload_bytes
            .or(file_import.max_upload_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        channel_capacity: file_import
            .channel_capacity
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY),
    };

    Ok(Config {
        server,
        database,
        jellyfin,
        sync,
        import,
        metadata,
    })
}
