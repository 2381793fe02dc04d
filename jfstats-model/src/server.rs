use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Outer sync state of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
    Syncing,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Failed)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "syncing" => Ok(SyncStatus::Syncing),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(ModelError::invalid("sync_status", other)),
        }
    }
}

/// Phase reached within one sync run. Ordered: a run only moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SyncProgress {
    #[default]
    NotStarted,
    Users,
    Libraries,
    Items,
    Activities,
    Completed,
}

impl SyncProgress {
    /// Phases executed by a full sync, in order.
    pub const PHASES: [SyncProgress; 4] = [
        SyncProgress::Users,
        SyncProgress::Libraries,
        SyncProgress::Items,
        SyncProgress::Activities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncProgress::NotStarted => "not_started",
            SyncProgress::Users => "users",
            SyncProgress::Libraries => "libraries",
            SyncProgress::Items => "items",
            SyncProgress::Activities => "activities",
            SyncProgress::Completed => "completed",
        }
    }

    pub fn ordinal(&self) -> u8 {
        match self {
            SyncProgress::NotStarted => 0,
            SyncProgress::Users => 1,
            SyncProgress::Libraries => 2,
            SyncProgress::Items => 3,
            SyncProgress::Activities => 4,
            SyncProgress::Completed => 5,
        }
    }

    /// Percentage shown by the UI, derived from the phase position.
    pub fn percentage(&self) -> u8 {
        self.ordinal() * 20
    }
}

impl fmt::Display for SyncProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncProgress {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(SyncProgress::NotStarted),
            "users" => Ok(SyncProgress::Users),
            "libraries" => Ok(SyncProgress::Libraries),
            "items" => Ok(SyncProgress::Items),
            "activities" => Ok(SyncProgress::Activities),
            "completed" => Ok(SyncProgress::Completed),
            other => Err(ModelError::invalid("sync_progress", other)),
        }
    }
}

/// Sync bookkeeping columns of a server row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSyncState {
    pub sync_status: SyncStatus,
    pub sync_progress: SyncProgress,
    pub sync_error: Option<String>,
    pub last_sync_started: Option<DateTime<Utc>>,
    pub last_sync_completed: Option<DateTime<Utc>>,
}

impl ServerSyncState {
    pub fn progress_percentage(&self) -> u8 {
        self.sync_progress.percentage()
    }

    pub fn is_ready(&self) -> bool {
        self.sync_status == SyncStatus::Completed
    }
}

/// A configured Jellyfin connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: i32,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    #[serde(flatten)]
    pub sync: ServerSyncState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewServer {
    pub name: String,
    pub url: String,
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentage_follows_phase_order() {
        let values: Vec<u8> = [
            SyncProgress::NotStarted,
            SyncProgress::Users,
            SyncProgress::Libraries,
            SyncProgress::Items,
            SyncProgress::Activities,
            SyncProgress::Completed,
        ]
        .iter()
        .map(SyncProgress::percentage)
        .collect();
        assert_eq!(values, vec![0, 20, 40, 60, 80, 100]);
        assert!(SyncProgress::Users < SyncProgress::Items);
    }

    #[test]
    fn status_strings_round_trip_through_from_str() {
        for status in [
            SyncStatus::Pending,
            SyncStatus::Syncing,
            SyncStatus::Completed,
            SyncStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SyncStatus>(), Ok(status));
        }
        assert!("stalled".parse::<SyncStatus>().is_err());
        assert_eq!("not_started".parse::<SyncProgress>(), Ok(SyncProgress::NotStarted));
    }

    #[test]
    fn api_key_is_never_serialized() {
        let server = ServerRecord {
            id: 1,
            name: "Home".into(),
            url: "http://jf.local".into(),
            api_key: "secret".into(),
            sync: ServerSyncState::default(),
        };
        let json = serde_json::to_value(&server).expect("serialize");
        assert!(json.get("apiKey").is_none());
        assert_eq!(json["syncStatus"], "pending");
        assert_eq!(json["syncProgress"], "not_started");
    }
}
