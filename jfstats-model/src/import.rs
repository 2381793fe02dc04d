use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Shape a raw playback record arrives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// An entry of Jellyfin's `/Sessions` response.
    LiveSession,
    /// A `jf_playback_activity` row from a Jellystats backup.
    Jellystats,
    /// Older string-typed JSON exports.
    Legacy,
    /// Playback Reporting plugin rows (TSV or JSON).
    PlaybackReporting,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::LiveSession => "live-session",
            SourceFormat::Jellystats => "jellystats",
            SourceFormat::Legacy => "legacy",
            SourceFormat::PlaybackReporting => "playback-reporting",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live-session" => Ok(SourceFormat::LiveSession),
            "jellystats" => Ok(SourceFormat::Jellystats),
            "legacy" => Ok(SourceFormat::Legacy),
            "playback-reporting" => Ok(SourceFormat::PlaybackReporting),
            other => Err(ModelError::invalid("source_format", other)),
        }
    }
}

/// Counters accumulated over one import run.
///
/// `total` counts every record handed to the mapper; `imported` only counts
/// rows that were actually inserted (duplicates are neither imported nor
/// errors).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: u64,
    pub total: u64,
    pub errors: u64,
    pub skipped: u64,
}

impl ImportSummary {
    pub fn duplicates(&self) -> u64 {
        self.total
            .saturating_sub(self.imported)
            .saturating_sub(self.errors)
            .saturating_sub(self.skipped)
    }
}
