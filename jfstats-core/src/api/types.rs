//! Request and response bodies of the HTTP interface.

use chrono::{DateTime, Utc};
use jfstats_model::{ImportSummary, NewServer, ServerRecord, SourceFormat, SyncProgress, SyncStatus};
use serde::{Deserialize, Serialize};

use crate::mapping::LiveSessionView;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServerRequest {
    pub name: Option<String>,
    pub url: String,
    #[serde(alias = "api_key")]
    pub api_key: String,
}

impl CreateServerRequest {
    /// Falls back to the name Jellyfin reports for itself.
    pub fn into_new_server(self, reported_name: Option<String>) -> NewServer {
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .or(reported_name)
            .unwrap_or_else(|| self.url.clone());
        NewServer {
            name,
            url: self.url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub server_id: i32,
    pub sync_status: SyncStatus,
    pub sync_progress: SyncProgress,
    pub sync_error: Option<String>,
    pub last_sync_started: Option<DateTime<Utc>>,
    pub last_sync_completed: Option<DateTime<Utc>>,
    pub progress_percentage: u8,
    pub is_ready: bool,
}

impl From<&ServerRecord> for SyncStatusResponse {
    fn from(server: &ServerRecord) -> Self {
        let sync = &server.sync;
        Self {
            server_id: server.id,
            sync_status: sync.sync_status,
            sync_progress: sync.sync_progress,
            sync_error: sync.sync_error.clone(),
            last_sync_started: sync.last_sync_started,
            last_sync_completed: sync.last_sync_completed,
            progress_percentage: sync.progress_percentage(),
            is_ready: sync.is_ready(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAcceptedResponse {
    pub server_id: i32,
    pub job: String,
    pub queued: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub reset_server_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionsResponse {
    pub server_id: i32,
    pub sessions: Vec<LiveSessionView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportQuery {
    #[serde(alias = "server_id")]
    pub server_id: i32,
}

/// Import result; field names are kept snake_case for existing dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    pub imported_count: u64,
    pub total_count: u64,
    pub error_count: u64,
    pub skipped_count: u64,
}

impl ImportResponse {
    pub fn from_summary(format: SourceFormat, summary: &ImportSummary) -> Self {
        let mut message = format!(
            "Imported {} of {} {format} records",
            summary.imported, summary.total
        );
        let duplicates = summary.duplicates();
        if duplicates > 0 {
            message.push_str(&format!(", {duplicates} already present"));
        }
        if summary.skipped > 0 {
            message.push_str(&format!(", {} skipped", summary.skipped));
        }
        if summary.errors > 0 {
            message.push_str(&format!(", {} failed", summary.errors));
        }
        Self {
            success: true,
            message,
            imported_count: summary.imported,
            total_count: summary.total,
            error_count: summary.errors,
            skipped_count: summary.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_message_mentions_every_counter() {
        let summary = ImportSummary {
            imported: 5,
            total: 9,
            errors: 1,
            skipped: 2,
        };
        let response = ImportResponse::from_summary(SourceFormat::Legacy, &summary);
        assert_eq!(
            response.message,
            "Imported 5 of 9 legacy records, 1 already present, 2 skipped, 1 failed"
        );
        assert_eq!(response.total_count, 9);
    }

    #[test]
    fn server_name_falls_back_to_reported_name() {
        let request = CreateServerRequest {
            name: Some("  ".into()),
            url: "http://jf.local:8096/".into(),
            api_key: "k".into(),
        };
        let server = request.into_new_server(Some("Living Room".into()));
        assert_eq!(server.name, "Living Room");
        assert_eq!(server.url, "http://jf.local:8096");
    }
}
