//! Ordered key tables for each canonical field, selected by source format.
//!
//! A key is either a plain property name or a dotted path into nested objects
//! (`"PlayState.PositionTicks"`). Keys are tried in order and the first value
//! that parses wins, so one table covers camelCase, snake_case and PascalCase
//! variants of the same export.

use chrono::{DateTime, Utc};
use jfstats_model::SourceFormat;
use serde_json::Value;

use super::time::parse_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    UserId,
    UserName,
    ItemId,
    EpisodeId,
    ItemName,
    ItemType,
    SeriesName,
    SeasonId,
    ClientName,
    DeviceName,
    DeviceId,
    StartTime,
    EndTime,
    LastActivity,
    /// Seconds of playback.
    Duration,
    PositionTicks,
    RuntimeTicks,
    PercentComplete,
    Completed,
    IsPaused,
    IsMuted,
    PlayMethod,
    IsTranscoded,
    TranscodingInfo,
    TranscodeReasons,
    MediaStreams,
    SourceContainer,
    SourceVideoCodec,
    SourceAudioCodec,
    SourceWidth,
    SourceHeight,
    SourceBitrate,
    TranscodeVideoCodec,
    TranscodeAudioCodec,
    TranscodeContainer,
    TranscodeWidth,
    TranscodeHeight,
    TranscodeBitrate,
}

pub fn field_keys(format: SourceFormat, field: Field) -> &'static [&'static str] {
    match format {
        SourceFormat::LiveSession => live_keys(field),
        SourceFormat::Jellystats => jellystats_keys(field),
        SourceFormat::Legacy => legacy_keys(field),
        SourceFormat::PlaybackReporting => playback_reporting_keys(field),
    }
}

fn live_keys(field: Field) -> &'static [&'static str] {
    match field {
        Field::Id => &["Id"],
        Field::UserId => &["UserId"],
        Field::UserName => &["UserName"],
        Field::ItemId => &["NowPlayingItem.Id"],
        Field::ItemName => &["NowPlayingItem.Name"],
        Field::ItemType => &["NowPlayingItem.Type"],
        Field::SeriesName => &["NowPlayingItem.SeriesName"],
        Field::SeasonId => &["NowPlayingItem.SeasonId"],
        Field::ClientName => &["Client"],
        Field::DeviceName => &["DeviceName"],
        Field::DeviceId => &["DeviceId"],
        Field::LastActivity => &["LastActivityDate", "LastPlaybackCheckIn"],
        Field::PositionTicks => &["PlayState.PositionTicks"],
        Field::RuntimeTicks => &["NowPlayingItem.RunTimeTicks"],
        Field::IsPaused => &["PlayState.IsPaused"],
        Field::IsMuted => &["PlayState.IsMuted"],
        Field::PlayMethod => &["PlayState.PlayMethod"],
        Field::TranscodingInfo => &["TranscodingInfo"],
        Field::TranscodeReasons => &["TranscodingInfo.TranscodeReasons"],
        Field::MediaStreams => &["NowPlayingItem.MediaStreams"],
        Field::SourceContainer => &["NowPlayingItem.Container"],
        Field::TranscodeVideoCodec => &["TranscodingInfo.VideoCodec"],
        Field::TranscodeAudioCodec => &["TranscodingInfo.AudioCodec"],
        Field::TranscodeContainer => &["TranscodingInfo.Container"],
        Field::TranscodeWidth => &["TranscodingInfo.Width"],
        Field::TranscodeHeight => &["TranscodingInfo.Height"],
        Field::TranscodeBitrate => &["TranscodingInfo.Bitrate"],
        _ => &[],
    }
}

fn jellystats_keys(field: Field) -> &'static [&'static str] {
    match field {
        Field::Id => &["Id"],
        Field::UserId => &["UserId"],
        Field::UserName => &["UserName"],
        Field::ItemId => &["NowPlayingItemId"],
        Field::EpisodeId => &["EpisodeId"],
        Field::ItemName => &["NowPlayingItemName"],
        Field::SeriesName => &["SeriesName"],
        Field::SeasonId => &["SeasonId"],
        Field::ClientName => &["Client"],
        Field::DeviceName => &["DeviceName"],
        Field::DeviceId => &["DeviceId"],
        Field::StartTime => &["ActivityDateInserted"],
        Field::Duration => &["PlaybackDuration"],
        Field::PositionTicks => &["PlayState.PositionTicks"],
        Field::RuntimeTicks => &["PlayState.RuntimeTicks"],
        Field::PercentComplete => &["PlayState.PercentComplete"],
        Field::Completed => &["PlayState.Completed"],
        Field::IsPaused => &["IsPaused", "PlayState.IsPaused"],
        Field::IsMuted => &["PlayState.IsMuted"],
        Field::PlayMethod => &["PlayMethod"],
        Field::TranscodingInfo => &["TranscodingInfo"],
        Field::TranscodeReasons => &["TranscodingInfo.TranscodeReasons"],
        Field::MediaStreams => &["MediaStreams"],
        Field::SourceContainer => &["OriginalContainer"],
        Field::TranscodeVideoCodec => &["TranscodingInfo.VideoCodec"],
        Field::TranscodeAudioCodec => &["TranscodingInfo.AudioCodec"],
        Field::TranscodeContainer => &["TranscodingInfo.Container"],
        Field::TranscodeWidth => &["TranscodingInfo.Width"],
        Field::TranscodeHeight => &["TranscodingInfo.Height"],
        Field::TranscodeBitrate => &["TranscodingInfo.Bitrate"],
        _ => &[],
    }
}

fn legacy_keys(field: Field) -> &'static [&'static str] {
    match field {
        Field::Id => &["id"],
        Field::UserId => &["user_jellyfin_id", "user_id"],
        Field::UserName => &["user_name"],
        Field::ItemId => &["item_jellyfin_id"],
        Field::ItemName => &["item_name"],
        Field::ItemType => &["item_type"],
        Field::SeriesName => &["series_name"],
        Field::SeasonId => &["season_jellyfin_id", "season_id"],
        Field::ClientName => &["client_name"],
        Field::DeviceName => &["device_name"],
        Field::DeviceId => &["device_id"],
        Field::StartTime => &["start_time"],
        Field::EndTime => &["end_time"],
        Field::LastActivity => &["last_activity_date"],
        Field::Duration => &["play_duration"],
        Field::PositionTicks => &["position_ticks"],
        Field::RuntimeTicks => &["runtime_ticks"],
        Field::PercentComplete => &["percent_complete"],
        Field::Completed => &["completed"],
        Field::IsPaused => &["is_paused"],
        Field::IsMuted => &["is_muted"],
        Field::PlayMethod => &["play_method"],
        Field::IsTranscoded => &["is_transcoded"],
        Field::TranscodeReasons => &["transcode_reasons"],
        Field::SourceContainer => &["container"],
        Field::SourceVideoCodec => &["video_codec"],
        Field::SourceAudioCodec => &["audio_codec"],
        Field::SourceWidth => &["resolution_width"],
        Field::SourceHeight => &["resolution_height"],
        Field::SourceBitrate => &["bitrate", "video_bitrate"],
        Field::TranscodeVideoCodec => &["transcode_video_codec"],
        Field::TranscodeAudioCodec => &["transcode_audio_codec"],
        Field::TranscodeContainer => &["transcode_container"],
        Field::TranscodeWidth => &["transcode_width"],
        Field::TranscodeHeight => &["transcode_height"],
        Field::TranscodeBitrate => &["transcode_bitrate"],
        _ => &[],
    }
}

fn playback_reporting_keys(field: Field) -> &'static [&'static str] {
    match field {
        Field::StartTime => &[
            "timestamp",
            "Timestamp",
            "dateCreated",
            "date_created",
            "DateCreated",
        ],
        Field::UserId => &["userId", "user_id", "UserId"],
        Field::UserName => &["userName", "user_name", "UserName"],
        Field::ItemId => &["itemId", "item_id", "ItemId"],
        Field::ItemType => &["itemType", "item_type", "ItemType"],
        Field::ItemName => &["itemName", "item_name", "ItemName"],
        Field::PlayMethod => &[
            "playMethod",
            "play_method",
            "PlayMethod",
            "playbackMethod",
            "playback_method",
            "PlaybackMethod",
        ],
        Field::ClientName => &["clientName", "client_name", "ClientName"],
        Field::DeviceName => &["deviceName", "device_name", "DeviceName"],
        Field::Duration => &[
            "playDuration",
            "play_duration",
            "PlayDuration",
            "durationSeconds",
            "duration_seconds",
            "DurationSeconds",
        ],
        _ => &[],
    }
}

/// Lookup of one value by a plain key or dotted path.
pub fn lookup<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in key.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

/// Probes a record for canonical fields using the key table of its format.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    record: &'a Value,
    format: SourceFormat,
}

impl<'a> FieldReader<'a> {
    pub fn new(record: &'a Value, format: SourceFormat) -> Self {
        Self { record, format }
    }

    fn probe<T>(&self, field: Field, parse: impl Fn(&'a Value) -> Option<T>) -> Option<T> {
        field_keys(self.format, field)
            .iter()
            .filter_map(|key| lookup(self.record, key))
            .find_map(parse)
    }

    pub fn value(&self, field: Field) -> Option<&'a Value> {
        self.probe(field, Some)
    }

    pub fn has(&self, field: Field) -> bool {
        self.value(field).is_some()
    }

    pub fn str(&self, field: Field) -> Option<String> {
        self.probe(field, as_string)
    }

    pub fn i64(&self, field: Field) -> Option<i64> {
        self.probe(field, as_i64)
    }

    pub fn i32(&self, field: Field) -> Option<i32> {
        self.i64(field).and_then(|v| i32::try_from(v).ok())
    }

    pub fn f64(&self, field: Field) -> Option<f64> {
        self.probe(field, as_f64)
    }

    pub fn bool(&self, field: Field) -> Option<bool> {
        self.probe(field, as_bool)
    }

    pub fn datetime(&self, field: Field) -> Option<DateTime<Utc>> {
        self.probe(field, as_datetime)
    }

    /// List of strings, accepting a JSON array, a JSON-encoded array inside a
    /// string, or a comma separated string.
    pub fn string_list(&self, field: Field) -> Option<Vec<String>> {
        self.probe(field, as_string_list)
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        // String-typed exports only ever encode truth as the literal "true".
        Value::String(s) => Some(s.trim() == "true"),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_datetime(s),
        Value::Number(n) => n.as_i64().and_then(super::time::from_epoch),
        _ => None,
    }
}

fn as_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(as_string).collect()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if s.starts_with('[') {
                return serde_json::from_str::<Vec<String>>(s).ok();
            }
            Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_paths_walk_nested_objects() {
        let record = json!({ "PlayState": { "PositionTicks": 42, "PlayMethod": null } });
        let reader = FieldReader::new(&record, SourceFormat::LiveSession);
        assert_eq!(reader.i64(Field::PositionTicks), Some(42));
        assert_eq!(reader.str(Field::PlayMethod), None);
    }

    #[test]
    fn key_variants_are_probed_in_order() {
        for record in [
            json!({ "itemName": "camel" }),
            json!({ "item_name": "camel" }),
            json!({ "ItemName": "camel" }),
        ] {
            let reader = FieldReader::new(&record, SourceFormat::PlaybackReporting);
            assert_eq!(reader.str(Field::ItemName).as_deref(), Some("camel"));
        }

        let both = json!({ "itemName": "first", "ItemName": "second" });
        let reader = FieldReader::new(&both, SourceFormat::PlaybackReporting);
        assert_eq!(reader.str(Field::ItemName).as_deref(), Some("first"));
    }

    #[test]
    fn string_typed_values_parse_defensively() {
        let record = json!({
            "play_duration": "120",
            "position_ticks": "not a number",
            "completed": "True",
            "is_paused": "true",
            "percent_complete": "55.5"
        });
        let reader = FieldReader::new(&record, SourceFormat::Legacy);
        assert_eq!(reader.i64(Field::Duration), Some(120));
        assert_eq!(reader.i64(Field::PositionTicks), None);
        assert_eq!(reader.bool(Field::Completed), Some(false));
        assert_eq!(reader.bool(Field::IsPaused), Some(true));
        assert_eq!(reader.f64(Field::PercentComplete), Some(55.5));
    }

    #[test]
    fn string_lists_accept_several_encodings() {
        let array = json!({ "transcode_reasons": ["ContainerNotSupported"] });
        let encoded = json!({ "transcode_reasons": "[\"A\",\"B\"]" });
        let csv = json!({ "transcode_reasons": "A, B" });
        for (record, expected) in [(array, 1), (encoded, 2), (csv, 2)] {
            let reader = FieldReader::new(&record, SourceFormat::Legacy);
            assert_eq!(
                reader.string_list(Field::TranscodeReasons).map(|v| v.len()),
                Some(expected)
            );
        }
    }
}
