use chrono::{DateTime, Utc};
use jfstats_model::{PlayMethod, Session, SourceFormat, UNKNOWN_USER};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::{Field, FieldReader};
use super::time::{format_hms, progress_percent, ticks_to_seconds};
use super::{
    COMPLETION_THRESHOLD_PERCENT, MappingResult, derived_id, source_from_streams,
    transcode_descriptor,
};

/// Deterministic id of a live playback. `first_seen` separates repeated
/// plays of the same item within one client session.
pub fn live_session_id(
    server_id: i32,
    session_id: &str,
    item_id: &str,
    first_seen: Option<DateTime<Utc>>,
) -> String {
    let server = server_id.to_string();
    match first_seen {
        Some(seen) => derived_id(&[
            "live",
            &server,
            session_id,
            item_id,
            &seen.timestamp_millis().to_string(),
        ]),
        None => derived_id(&["live", &server, session_id, item_id]),
    }
}

pub(super) fn map(record: &Value, server_id: i32) -> MappingResult {
    let reader = FieldReader::new(record, SourceFormat::LiveSession);
    if record.get("NowPlayingItem").is_none_or(Value::is_null) {
        return Ok(None);
    }

    let session_id = reader.str(Field::Id).unwrap_or_default();
    let item_id = reader.str(Field::ItemId);
    let mut session = Session::new(
        live_session_id(server_id, &session_id, item_id.as_deref().unwrap_or_default(), None),
        server_id,
    );

    let position = reader.i64(Field::PositionTicks);
    let runtime = reader.i64(Field::RuntimeTicks);
    let percent = progress_percent(position.unwrap_or(0), runtime.unwrap_or(0));
    let transcoding = reader.has(Field::TranscodingInfo);

    session.user_id = reader.str(Field::UserId);
    session.user_name = reader.str(Field::UserName).unwrap_or_else(|| UNKNOWN_USER.to_string());
    session.item_id = item_id;
    session.item_name = reader.str(Field::ItemName);
    session.series_name = reader.str(Field::SeriesName);
    session.season_id = reader.str(Field::SeasonId);
    session.client_name = reader.str(Field::ClientName);
    session.device_name = reader.str(Field::DeviceName);
    session.device_id = reader.str(Field::DeviceId);
    session.last_activity_date = reader.datetime(Field::LastActivity);
    session.play_duration = position.map(ticks_to_seconds).unwrap_or(0);
    session.position_ticks = position;
    session.runtime_ticks = runtime;
    session.percent_complete = percent;
    session.completed = percent >= COMPLETION_THRESHOLD_PERCENT;
    session.is_paused = reader.bool(Field::IsPaused).unwrap_or(false);
    session.is_muted = reader.bool(Field::IsMuted).unwrap_or(false);
    session.is_active = true;
    session.play_method = reader
        .str(Field::PlayMethod)
        .and_then(|label| PlayMethod::from_label(&label));
    session.source = source_from_streams(&reader);
    session.is_transcoded = transcoding || session.play_method == Some(PlayMethod::Transcode);
    if transcoding {
        session.transcode = transcode_descriptor(&reader);
        session.transcode_reasons = reader.string_list(Field::TranscodeReasons);
    }
    session.raw_data = record.clone();

    Ok(Some(session))
}

/// Display shape of an in-flight playback for the active sessions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSessionView {
    pub session_id: String,
    pub user_name: String,
    pub item_name: Option<String>,
    pub series_name: Option<String>,
    pub client_name: Option<String>,
    pub device_name: Option<String>,
    pub play_method: Option<PlayMethod>,
    pub is_paused: bool,
    pub is_transcoded: bool,
    pub progress_percent: f64,
    pub position: String,
    pub runtime: String,
}

impl LiveSessionView {
    /// `None` for idle clients (no `NowPlayingItem`).
    pub fn from_record(record: &Value, server_id: i32) -> Option<Self> {
        let session = map(record, server_id).ok()??;
        let reader = FieldReader::new(record, SourceFormat::LiveSession);
        Some(Self {
            session_id: reader.str(Field::Id).unwrap_or_default(),
            position: format_hms(session.position_ticks.map(ticks_to_seconds).unwrap_or(0)),
            runtime: format_hms(session.runtime_ticks.map(ticks_to_seconds).unwrap_or(0)),
            progress_percent: session.percent_complete,
            user_name: session.user_name,
            item_name: session.item_name,
            series_name: session.series_name,
            client_name: session.client_name,
            device_name: session.device_name,
            play_method: session.play_method,
            is_paused: session.is_paused,
            is_transcoded: session.is_transcoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "Id": "sess-1",
            "UserId": "u1",
            "UserName": "alice",
            "Client": "Jellyfin Web",
            "DeviceName": "Firefox",
            "DeviceId": "dev-1",
            "LastActivityDate": "2024-03-01T20:00:00.0000000Z",
            "PlayState": {
                "PositionTicks": 18_000_000_000i64,
                "IsPaused": false,
                "IsMuted": true,
                "PlayMethod": "Transcode"
            },
            "NowPlayingItem": {
                "Id": "ep-9",
                "Name": "Pilot",
                "SeriesName": "Show",
                "SeasonId": "season-1",
                "RunTimeTicks": 36_000_000_000i64,
                "Container": "mkv",
                "MediaStreams": [
                    { "Type": "Video", "Codec": "hevc", "Width": 3840, "Height": 2160, "BitRate": 40_000_000 },
                    { "Type": "Audio", "Codec": "truehd" }
                ]
            },
            "TranscodingInfo": {
                "VideoCodec": "h264",
                "AudioCodec": "aac",
                "Container": "ts",
                "Width": 1920,
                "Height": 1080,
                "Bitrate": 8_000_000,
                "TranscodeReasons": ["VideoCodecNotSupported"]
            }
        })
    }

    #[test]
    fn maps_a_transcoding_playback() {
        let session = map(&sample(), 4).expect("map").expect("session");
        assert_eq!(session.server_id, 4);
        assert_eq!(session.item_id.as_deref(), Some("ep-9"));
        assert_eq!(session.play_duration, 1800);
        assert_eq!(session.percent_complete, 50.0);
        assert!(!session.completed);
        assert!(session.is_active);
        assert!(session.is_muted);
        assert!(session.is_transcoded);
        assert_eq!(session.play_method, Some(PlayMethod::Transcode));
        assert_eq!(session.source.resolution().as_deref(), Some("3840x2160"));
        assert_eq!(session.source.audio_codec.as_deref(), Some("truehd"));
        assert_eq!(session.transcode.video_codec.as_deref(), Some("h264"));
        assert_eq!(
            session.transcode_reasons,
            Some(vec!["VideoCodecNotSupported".to_string()])
        );
        assert_eq!(session.raw_data, sample());
    }

    #[test]
    fn idle_sessions_are_skipped() {
        let mut record = sample();
        record["NowPlayingItem"] = Value::Null;
        assert_eq!(map(&record, 1), Ok(None));
    }

    #[test]
    fn missing_runtime_yields_zero_progress() {
        let mut record = sample();
        record["NowPlayingItem"]["RunTimeTicks"] = json!(0);
        let session = map(&record, 1).expect("map").expect("session");
        assert_eq!(session.percent_complete, 0.0);
    }

    #[test]
    fn view_formats_positions() {
        let view = LiveSessionView::from_record(&sample(), 1).expect("view");
        assert_eq!(view.position, "00:30:00");
        assert_eq!(view.runtime, "01:00:00");
        assert_eq!(view.progress_percent, 50.0);
        assert_eq!(view.session_id, "sess-1");
    }

    #[test]
    fn first_seen_changes_the_live_id() {
        let now = Utc::now();
        assert_ne!(
            live_session_id(1, "s", "i", None),
            live_session_id(1, "s", "i", Some(now))
        );
        assert_eq!(
            live_session_id(1, "s", "i", Some(now)),
            live_session_id(1, "s", "i", Some(now))
        );
    }
}
