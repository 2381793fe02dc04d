pub mod jellyfin;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub use jellyfin::{
    ActivityLogEntry, JellyfinClient, JellyfinClientConfig, JellyfinItem, JellyfinUser,
    QueryResult, SystemInfo, VirtualFolder,
};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Invalid API key")]
    Unauthorized,

    #[error("Jellyfin server is unreachable: {0}")]
    Unavailable(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl ProviderError {
    /// True when retrying after the Jellyfin server recovers is the right move.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_))
    }

    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => ProviderError::Unauthorized,
            500..=599 => ProviderError::Unavailable(format!("upstream returned {status}")),
            _ => ProviderError::Http { status, body },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ProviderError::Unavailable(err.to_string())
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::from_status(status.as_u16(), err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Read-only view of one Jellyfin server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JellyfinApi: Send + Sync {
    async fn get_system_info(&self) -> Result<SystemInfo, ProviderError>;

    /// Raw `/Sessions` entries; the session mapper keeps the payload verbatim.
    async fn get_sessions(&self) -> Result<Vec<Value>, ProviderError>;

    async fn get_users(&self) -> Result<Vec<JellyfinUser>, ProviderError>;

    async fn get_libraries(&self) -> Result<Vec<VirtualFolder>, ProviderError>;

    async fn get_items(
        &self,
        start_index: u32,
        limit: u32,
    ) -> Result<QueryResult<JellyfinItem>, ProviderError>;

    async fn get_activity_log(
        &self,
        start_index: u32,
        limit: u32,
        min_date: Option<DateTime<Utc>>,
    ) -> Result<QueryResult<ActivityLogEntry>, ProviderError>;
}

/// Builds an API handle for a stored server (url + api key).
pub trait JellyfinConnector: Send + Sync {
    fn connect(&self, url: &str, api_key: &str) -> Result<Arc<dyn JellyfinApi>, ProviderError>;
}

/// Connector producing real HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct HttpJellyfinConnector {
    config: JellyfinClientConfig,
}

impl HttpJellyfinConnector {
    pub fn new(config: JellyfinClientConfig) -> Self {
        Self { config }
    }
}

impl JellyfinConnector for HttpJellyfinConnector {
    fn connect(&self, url: &str, api_key: &str) -> Result<Arc<dyn JellyfinApi>, ProviderError> {
        Ok(Arc::new(JellyfinClient::new(url, api_key, &self.config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_connectivity_issues() {
        for status in [500, 502, 503, 504] {
            let err = ProviderError::from_status(status, String::new());
            assert!(err.is_connectivity(), "{status} should be connectivity");
        }
        assert!(matches!(
            ProviderError::from_status(401, String::new()),
            ProviderError::Unauthorized
        ));
        let other = ProviderError::from_status(404, "missing".into());
        assert!(!other.is_connectivity());
        assert!(matches!(other, ProviderError::Http { status: 404, .. }));
    }
}
