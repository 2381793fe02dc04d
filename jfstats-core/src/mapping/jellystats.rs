use jfstats_model::{PlayMethod, Session, SourceFormat, UNKNOWN_USER};
use serde_json::Value;

use super::fields::{Field, FieldReader};
use super::time::{progress_percent, seconds_to_ticks};
use super::{
    COMPLETION_THRESHOLD_PERCENT, MappingResult, end_after, source_from_streams,
    transcode_descriptor,
};

/// Maps one `jf_playback_activity` row.
pub(super) fn map(record: &Value, server_id: i32) -> MappingResult {
    let reader = FieldReader::new(record, SourceFormat::Jellystats);
    let Some(id) = reader.str(Field::Id) else {
        return Ok(None);
    };

    let mut session = Session::new(id, server_id);
    let duration = reader.i64(Field::Duration).unwrap_or(0).max(0);
    let start = reader.datetime(Field::StartTime);
    let runtime = reader.i64(Field::RuntimeTicks);
    let position = reader
        .i64(Field::PositionTicks)
        .or_else(|| runtime.map(|_| seconds_to_ticks(duration)));
    let percent = reader
        .f64(Field::PercentComplete)
        .map(|p| p.clamp(0.0, 100.0))
        .unwrap_or_else(|| progress_percent(position.unwrap_or(0), runtime.unwrap_or(0)));

    let raw_method = reader.str(Field::PlayMethod);
    let transcoding = reader.has(Field::TranscodingInfo);

    session.user_id = reader.str(Field::UserId);
    session.user_name = reader.str(Field::UserName).unwrap_or_else(|| UNKNOWN_USER.to_string());
    // Episodes are preferred over the parent series.
    session.item_id = reader.str(Field::EpisodeId).or_else(|| reader.str(Field::ItemId));
    session.item_name = reader.str(Field::ItemName);
    session.series_name = reader.str(Field::SeriesName);
    session.season_id = reader.str(Field::SeasonId);
    session.client_name = reader.str(Field::ClientName);
    session.device_name = reader.str(Field::DeviceName);
    session.device_id = reader.str(Field::DeviceId);
    session.start_time = start;
    session.end_time = end_after(start, duration)?;
    session.last_activity_date = session.end_time;
    session.play_duration = duration;
    session.position_ticks = position;
    session.runtime_ticks = runtime;
    session.percent_complete = percent;
    session.completed = reader
        .bool(Field::Completed)
        .unwrap_or(percent >= COMPLETION_THRESHOLD_PERCENT);
    session.is_paused = reader.bool(Field::IsPaused).unwrap_or(false);
    session.is_muted = reader.bool(Field::IsMuted).unwrap_or(false);
    session.play_method = raw_method.as_deref().and_then(PlayMethod::from_label);
    session.is_transcoded = transcoding || raw_method.as_deref() != Some("DirectPlay");
    session.source = source_from_streams(&reader);
    if transcoding {
        session.transcode = transcode_descriptor(&reader);
        session.transcode_reasons = reader.string_list(Field::TranscodeReasons);
    }
    session.raw_data = record.clone();

    Ok(Some(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn maps_a_direct_play_row() {
        let record = json!({
            "Id": "a",
            "UserId": "u1",
            "UserName": "x",
            "NowPlayingItemId": "series-1",
            "EpisodeId": "episode-7",
            "NowPlayingItemName": "Show - Episode",
            "PlaybackDuration": 120,
            "ActivityDateInserted": "2024-01-01T00:00:00Z",
            "PlayMethod": "DirectPlay",
            "TranscodingInfo": null
        });
        let session = map(&record, 2).expect("map").expect("session");

        assert_eq!(session.id, "a");
        assert_eq!(session.item_id.as_deref(), Some("episode-7"));
        assert_eq!(session.play_duration, 120);
        assert_eq!(
            session.start_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            session.end_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0).unwrap())
        );
        assert_eq!(session.play_method, Some(PlayMethod::DirectPlay));
        assert!(!session.is_transcoded);
        assert!(!session.is_active);
    }

    #[test]
    fn transcoded_when_method_is_not_direct_play_or_info_present() {
        let by_method = json!({ "Id": "b", "PlayMethod": "Transcode (v:h264 a:aac)" });
        let session = map(&by_method, 1).expect("map").expect("session");
        assert!(session.is_transcoded);
        assert_eq!(session.play_method, Some(PlayMethod::Transcode));

        let by_info = json!({
            "Id": "c",
            "PlayMethod": "DirectPlay",
            "TranscodingInfo": { "AudioCodec": "aac", "TranscodeReasons": ["AudioCodecNotSupported"] }
        });
        let session = map(&by_info, 1).expect("map").expect("session");
        assert!(session.is_transcoded);
        assert_eq!(session.transcode.audio_codec.as_deref(), Some("aac"));
    }

    #[test]
    fn falls_back_to_now_playing_item_and_defaults() {
        let record = json!({ "Id": "d", "NowPlayingItemId": "movie-1" });
        let session = map(&record, 1).expect("map").expect("session");
        assert_eq!(session.item_id.as_deref(), Some("movie-1"));
        assert_eq!(session.user_name, UNKNOWN_USER);
        assert_eq!(session.play_duration, 0);
        assert_eq!(session.percent_complete, 0.0);
    }

    #[test]
    fn completion_uses_play_state_progress() {
        let record = json!({
            "Id": "e",
            "PlaybackDuration": 3300,
            "PlayState": { "PositionTicks": 33_000_000_000i64, "RuntimeTicks": 36_000_000_000i64 }
        });
        let session = map(&record, 1).expect("map").expect("session");
        assert_eq!(session.percent_complete, 92.0);
        assert!(session.completed);
    }
}
