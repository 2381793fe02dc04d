use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Jellyfin expresses positions and runtimes in 100ns ticks.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Snapshot name used when a source record carries no user name.
pub const UNKNOWN_USER: &str = "Unknown User";

/// How the client consumed the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMethod {
    DirectPlay,
    DirectStream,
    Transcode,
}

impl PlayMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayMethod::DirectPlay => "DirectPlay",
            PlayMethod::DirectStream => "DirectStream",
            PlayMethod::Transcode => "Transcode",
        }
    }

    /// Lenient parser for labels found in exports, e.g. `"Transcode (v:h264 a:aac)"`
    /// or `"direct play"`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        if normalized.starts_with("transcode") {
            Some(PlayMethod::Transcode)
        } else if normalized.starts_with("directplay") {
            Some(PlayMethod::DirectPlay)
        } else if normalized.starts_with("directstream") {
            Some(PlayMethod::DirectStream)
        } else {
            None
        }
    }
}

impl fmt::Display for PlayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlayMethod::from_label(s).ok_or_else(|| ModelError::invalid("play_method", s))
    }
}

/// Codec/resolution/bitrate description of one side of a stream
/// (the source file or the transcoded output).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub container: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bitrate: Option<i64>,
}

impl StreamDescriptor {
    /// `"1920x1080"` when both dimensions are known.
    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(format!("{w}x{h}")),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.video_codec.is_none()
            && self.audio_codec.is_none()
            && self.container.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.bitrate.is_none()
    }
}

/// One playback event, normalized from any supported source.
///
/// `user_id` and `item_id` are soft references: they are nulled out when the
/// referenced row does not exist, while the snapshot fields (`user_name`,
/// `item_name`, ...) keep what the source reported at import time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub server_id: i32,
    pub user_id: Option<String>,
    pub item_id: Option<String>,

    pub user_name: String,
    pub item_name: Option<String>,
    pub series_name: Option<String>,
    pub season_id: Option<String>,
    pub client_name: Option<String>,
    pub device_name: Option<String>,
    pub device_id: Option<String>,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_activity_date: Option<DateTime<Utc>>,
    /// Seconds of playback.
    pub play_duration: i64,
    pub position_ticks: Option<i64>,
    pub runtime_ticks: Option<i64>,
    pub percent_complete: f64,

    pub completed: bool,
    pub is_paused: bool,
    pub is_muted: bool,
    pub is_active: bool,
    pub play_method: Option<PlayMethod>,

    pub source: StreamDescriptor,
    pub transcode: StreamDescriptor,
    pub is_transcoded: bool,
    pub transcode_reasons: Option<Vec<String>>,

    pub raw_data: Value,
}

impl Session {
    pub fn new(id: impl Into<String>, server_id: i32) -> Self {
        Self {
            id: id.into(),
            server_id,
            user_id: None,
            item_id: None,
            user_name: UNKNOWN_USER.to_string(),
            item_name: None,
            series_name: None,
            season_id: None,
            client_name: None,
            device_name: None,
            device_id: None,
            start_time: None,
            end_time: None,
            last_activity_date: None,
            play_duration: 0,
            position_ticks: None,
            runtime_ticks: None,
            percent_complete: 0.0,
            completed: false,
            is_paused: false,
            is_muted: false,
            is_active: false,
            play_method: None,
            source: StreamDescriptor::default(),
            transcode: StreamDescriptor::default(),
            is_transcoded: false,
            transcode_reasons: None,
            raw_data: Value::Null,
        }
    }
}
