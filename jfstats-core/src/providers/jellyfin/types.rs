//! Response shapes of the Jellyfin REST endpoints the sync workers read.
//!
//! Only the fields the service persists are modelled; everything else is
//! ignored by serde. `/Sessions` is intentionally kept as raw JSON because the
//! session mapper retains the full payload.

use chrono::{DateTime, Utc};
use jfstats_model::{ActivityRecord, ItemRecord, LibraryRecord, UserRecord};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemInfo {
    pub server_name: Option<String>,
    pub version: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPolicy {
    #[serde(default)]
    pub is_administrator: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JellyfinUser {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub policy: Option<UserPolicy>,
    pub last_login_date: Option<DateTime<Utc>>,
    pub last_activity_date: Option<DateTime<Utc>>,
}

impl JellyfinUser {
    pub fn into_record(self, server_id: i32) -> Option<UserRecord> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(UserRecord {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            server_id,
            is_administrator: self.policy.map(|p| p.is_administrator).unwrap_or(false),
            last_login_date: self.last_login_date,
            last_activity_date: self.last_activity_date,
        })
    }
}

/// Entry of `/Library/VirtualFolders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualFolder {
    pub name: Option<String>,
    pub collection_type: Option<String>,
    pub item_id: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

impl VirtualFolder {
    pub fn into_record(self, server_id: i32) -> Option<LibraryRecord> {
        let id = self.item_id.filter(|id| !id.is_empty())?;
        Some(LibraryRecord {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            server_id,
            collection_type: self.collection_type,
            locations: self.locations,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JellyfinItem {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub parent_id: Option<String>,
    pub series_id: Option<String>,
    pub series_name: Option<String>,
    pub season_id: Option<String>,
    pub index_number: Option<i32>,
    pub parent_index_number: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub production_year: Option<i32>,
    pub date_created: Option<DateTime<Utc>>,
}

impl JellyfinItem {
    pub fn into_record(self, server_id: i32) -> Option<ItemRecord> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(ItemRecord {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            server_id,
            item_type: self.item_type,
            parent_id: self.parent_id,
            series_id: self.series_id,
            series_name: self.series_name,
            season_id: self.season_id,
            index_number: self.index_number,
            parent_index_number: self.parent_index_number,
            runtime_ticks: self.run_time_ticks,
            production_year: self.production_year,
            date_created: self.date_created,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivityLogEntry {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub short_overview: Option<String>,
    #[serde(rename = "Type")]
    pub activity_type: Option<String>,
    pub item_id: Option<String>,
    pub user_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub severity: Option<String>,
}

impl ActivityLogEntry {
    pub fn into_record(self, server_id: i32) -> Option<ActivityRecord> {
        let id = self.id?.to_string();
        Some(ActivityRecord {
            name: self.name.unwrap_or_default(),
            id,
            server_id,
            short_overview: self.short_overview,
            activity_type: self.activity_type,
            item_id: self.item_id.filter(|id| !id.is_empty()),
            // Jellyfin reports system events with an all-zero user id.
            user_id: self
                .user_id
                .filter(|id| !id.is_empty() && id.chars().any(|c| c != '0' && c != '-')),
            date: self.date,
            severity: self.severity,
        })
    }
}

/// Envelope used by paged Jellyfin query endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResult<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_record_count: i64,
}
