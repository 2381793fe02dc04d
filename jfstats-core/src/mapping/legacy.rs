use jfstats_model::{PlayMethod, Session, SourceFormat, StreamDescriptor, UNKNOWN_USER};
use serde_json::Value;

use super::fields::{Field, FieldReader};
use super::time::progress_percent;
use super::{COMPLETION_THRESHOLD_PERCENT, MappingError, MappingResult, end_after};

/// Maps one row of the older string-typed JSON export. Every numeric and
/// boolean column arrives as text; unparseable values fall back to 0 / false
/// / null.
pub(super) fn map(record: &Value, server_id: i32) -> MappingResult {
    let reader = FieldReader::new(record, SourceFormat::Legacy);
    let Some(id) = reader.str(Field::Id) else {
        return Ok(None);
    };
    let item_id = reader
        .str(Field::ItemId)
        .ok_or(MappingError::MissingField("item_jellyfin_id"))?;

    let mut session = Session::new(id, server_id);
    let duration = reader.i64(Field::Duration).unwrap_or(0).max(0);
    let start = reader.datetime(Field::StartTime);
    let position = reader.i64(Field::PositionTicks);
    let runtime = reader.i64(Field::RuntimeTicks);
    let percent = reader
        .f64(Field::PercentComplete)
        .map(|p| p.clamp(0.0, 100.0))
        .unwrap_or_else(|| progress_percent(position.unwrap_or(0), runtime.unwrap_or(0)));

    session.user_id = reader.str(Field::UserId);
    session.user_name = reader.str(Field::UserName).unwrap_or_else(|| UNKNOWN_USER.to_string());
    session.item_id = Some(item_id);
    session.item_name = reader.str(Field::ItemName);
    session.series_name = reader.str(Field::SeriesName);
    session.season_id = reader.str(Field::SeasonId);
    session.client_name = reader.str(Field::ClientName);
    session.device_name = reader.str(Field::DeviceName);
    session.device_id = reader.str(Field::DeviceId);
    session.start_time = start;
    session.end_time = match reader.datetime(Field::EndTime) {
        Some(end) => Some(end),
        None => end_after(start, duration)?,
    };
    session.last_activity_date = reader.datetime(Field::LastActivity);
    session.play_duration = duration;
    session.position_ticks = position;
    session.runtime_ticks = runtime;
    session.percent_complete = percent;
    session.completed = reader.bool(Field::Completed).unwrap_or(false);
    session.is_paused = reader.bool(Field::IsPaused).unwrap_or(false);
    session.is_muted = reader.bool(Field::IsMuted).unwrap_or(false);
    session.play_method = reader
        .str(Field::PlayMethod)
        .and_then(|label| PlayMethod::from_label(&label));
    session.source = StreamDescriptor {
        video_codec: reader.str(Field::SourceVideoCodec),
        audio_codec: reader.str(Field::SourceAudioCodec),
        container: reader.str(Field::SourceContainer),
        width: reader.i32(Field::SourceWidth),
        height: reader.i32(Field::SourceHeight),
        bitrate: reader.i64(Field::SourceBitrate),
    };
    session.transcode = StreamDescriptor {
        video_codec: reader.str(Field::TranscodeVideoCodec),
        audio_codec: reader.str(Field::TranscodeAudioCodec),
        container: reader.str(Field::TranscodeContainer),
        width: reader.i32(Field::TranscodeWidth),
        height: reader.i32(Field::TranscodeHeight),
        bitrate: reader.i64(Field::TranscodeBitrate),
    };
    session.is_transcoded = reader.bool(Field::IsTranscoded).unwrap_or(false);
    session.transcode_reasons = reader.string_list(Field::TranscodeReasons);
    session.raw_data = record.clone();

    // Exports written before the completed column existed.
    if !session.completed && !reader.has(Field::Completed) {
        session.completed = percent >= COMPLETION_THRESHOLD_PERCENT;
    }

    Ok(Some(session))
}
