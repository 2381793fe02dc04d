use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STUCK_THRESHOLD: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_LIVE_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_RECENT_ACTIVITY_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_ITEM_PAGE_SIZE: u32 = 500;
pub const DEFAULT_ACTIVITY_PAGE_SIZE: u32 = 100;
pub const DEFAULT_RECENT_ACTIVITY_PAGES: u32 = 1;
pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fully resolved configuration handed to the server binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jellyfin: JellyfinConfig,
    pub sync: SyncConfig,
    pub import: ImportConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

// The URL usually embeds a password.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &crate::loader::db_url::redact(&self.url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JellyfinConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// A server `syncing` for longer than this is reset by the sweep.
    pub stuck_threshold: Duration,
    pub sweep_interval: Duration,
    pub live_poll_interval: Duration,
    pub recent_activity_interval: Duration,
    pub item_page_size: u32,
    pub activity_page_size: u32,
    pub recent_activity_pages: u32,
    pub workers: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stuck_threshold: DEFAULT_STUCK_THRESHOLD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            live_poll_interval: DEFAULT_LIVE_POLL_INTERVAL,
            recent_activity_interval: DEFAULT_RECENT_ACTIVITY_INTERVAL,
            item_page_size: DEFAULT_ITEM_PAGE_SIZE,
            activity_page_size: DEFAULT_ACTIVITY_PAGE_SIZE,
            recent_activity_pages: DEFAULT_RECENT_ACTIVITY_PAGES,
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub max_upload_bytes: u64,
    pub channel_capacity: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

pub(crate) fn default_user_agent() -> String {
    concat!("jfstats/", env!("CARGO_PKG_VERSION")).to_string()
}
