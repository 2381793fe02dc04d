use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::types::{
    ActivityLogEntry, JellyfinItem, JellyfinUser, QueryResult, SystemInfo, VirtualFolder,
};
use crate::providers::{JellyfinApi, ProviderError};

const AUTH_HEADER: &str = "X-Emby-Token";
const ITEM_FIELDS: &str = "DateCreated,ParentId,SeriesName,SeasonId,ProductionYear";
const ITEM_TYPES: &str = "Movie,Series,Season,Episode,Audio,MusicAlbum,MusicVideo,Video";

#[derive(Debug, Clone)]
pub struct JellyfinClientConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for JellyfinClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("jfstats/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Thin authenticated wrapper over the Jellyfin REST API.
#[derive(Debug, Clone)]
pub struct JellyfinClient {
    http: reqwest::Client,
    base_url: Url,
}

impl JellyfinClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        config: &JellyfinClientConfig,
    ) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(base_url.trim())
            .map_err(|e| ProviderError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProviderError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }
        // Url::join replaces the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(api_key)
            .map_err(|_| ProviderError::InvalidUrl("API key is not a valid header value".into()))?;
        headers.insert(AUTH_HEADER, token);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ProviderError::InvalidUrl(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = self.endpoint(path)?;
        debug!(%url, "jellyfin request");

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl JellyfinApi for JellyfinClient {
    async fn get_system_info(&self) -> Result<SystemInfo, ProviderError> {
        self.get_json("System/Info", &[]).await
    }

    async fn get_sessions(&self) -> Result<Vec<Value>, ProviderError> {
        self.get_json("Sessions", &[]).await
    }

    async fn get_users(&self) -> Result<Vec<JellyfinUser>, ProviderError> {
        self.get_json("Users", &[]).await
    }

    async fn get_libraries(&self) -> Result<Vec<VirtualFolder>, ProviderError> {
        self.get_json("Library/VirtualFolders", &[]).await
    }

    async fn get_items(
        &self,
        start_index: u32,
        limit: u32,
    ) -> Result<QueryResult<JellyfinItem>, ProviderError> {
        self.get_json(
            "Items",
            &[
                ("Recursive", "true".to_string()),
                ("StartIndex", start_index.to_string()),
                ("Limit", limit.to_string()),
                ("Fields", ITEM_FIELDS.to_string()),
                ("IncludeItemTypes", ITEM_TYPES.to_string()),
            ],
        )
        .await
    }

    async fn get_activity_log(
        &self,
        start_index: u32,
        limit: u32,
        min_date: Option<DateTime<Utc>>,
    ) -> Result<QueryResult<ActivityLogEntry>, ProviderError> {
        let mut query = vec![
            ("StartIndex", start_index.to_string()),
            ("Limit", limit.to_string()),
        ];
        if let Some(min_date) = min_date {
            query.push((
                "MinDate",
                min_date.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        self.get_json("System/ActivityLog/Entries", &query).await
    }
}
