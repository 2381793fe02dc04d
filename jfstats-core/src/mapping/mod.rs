//! Canonical session mapper.
//!
//! Every supported source shape is turned into one [`Session`]. A mapper
//! returns `Ok(None)` when the record lacks the identity field of its format
//! (the caller counts it as skipped) and `Err` when the record is unusable in
//! some other way (the caller counts it as an error).

pub mod fields;
pub mod jellystats;
pub mod legacy;
pub mod live;
pub mod playback_reporting;
pub mod time;

use chrono::{DateTime, Utc};
use jfstats_model::{Session, SourceFormat, StreamDescriptor};
use serde_json::Value;
use uuid::Uuid;

use fields::{Field, FieldReader};

pub use live::{LiveSessionView, live_session_id};
pub use time::{format_hms, progress_percent, ticks_to_seconds};

/// Share of the runtime after which a playback counts as completed when the
/// source carries no explicit flag.
pub const COMPLETION_THRESHOLD_PERCENT: f64 = 90.0;

/// Namespace for session ids derived from source data.
pub(crate) const SESSION_NAMESPACE: Uuid = Uuid::from_u128(0x6a0f_5c1e_93d4_4b8e_a1f2_7c3d_9e4b_2a10);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is out of range")]
    OutOfRange(&'static str),
}

pub type MappingResult = Result<Option<Session>, MappingError>;

pub fn map_record(format: SourceFormat, record: &Value, server_id: i32) -> MappingResult {
    if !record.is_object() {
        return Err(MappingError::NotAnObject);
    }
    match format {
        SourceFormat::LiveSession => live::map(record, server_id),
        SourceFormat::Jellystats => jellystats::map(record, server_id),
        SourceFormat::Legacy => legacy::map(record, server_id),
        SourceFormat::PlaybackReporting => playback_reporting::map(record, server_id),
    }
}

pub(crate) fn derived_id(parts: &[&str]) -> String {
    Uuid::new_v5(&SESSION_NAMESPACE, parts.join("\u{1f}").as_bytes()).to_string()
}

/// `start + seconds`; a duration that no timestamp can hold makes the record
/// unusable.
pub(crate) fn end_after(
    start: Option<DateTime<Utc>>,
    seconds: i64,
) -> Result<Option<DateTime<Utc>>, MappingError> {
    let Some(start) = start else {
        return Ok(None);
    };
    chrono::Duration::try_seconds(seconds.max(0))
        .and_then(|elapsed| start.checked_add_signed(elapsed))
        .map(Some)
        .ok_or(MappingError::OutOfRange("duration"))
}

/// Source stream described by Jellyfin's `MediaStreams` array.
pub(crate) fn source_from_streams(reader: &FieldReader<'_>) -> StreamDescriptor {
    let mut source = StreamDescriptor {
        container: reader.str(Field::SourceContainer),
        ..StreamDescriptor::default()
    };
    let Some(Value::Array(streams)) = reader.value(Field::MediaStreams) else {
        return source;
    };
    let kind = |stream: &Value| stream.get("Type").and_then(Value::as_str).map(str::to_owned);

    if let Some(video) = streams.iter().find(|s| kind(s).as_deref() == Some("Video")) {
        source.video_codec = video.get("Codec").and_then(Value::as_str).map(str::to_owned);
        source.width = video.get("Width").and_then(Value::as_i64).and_then(|v| i32::try_from(v).ok());
        source.height = video.get("Height").and_then(Value::as_i64).and_then(|v| i32::try_from(v).ok());
        source.bitrate = video.get("BitRate").and_then(Value::as_i64);
    }
    if let Some(audio) = streams.iter().find(|s| kind(s).as_deref() == Some("Audio")) {
        source.audio_codec = audio.get("Codec").and_then(Value::as_str).map(str::to_owned);
    }
    source
}

pub(crate) fn transcode_descriptor(reader: &FieldReader<'_>) -> StreamDescriptor {
    StreamDescriptor {
        video_codec: reader.str(Field::TranscodeVideoCodec),
        audio_codec: reader.str(Field::TranscodeAudioCodec),
        container: reader.str(Field::TranscodeContainer),
        width: reader.i32(Field::TranscodeWidth),
        height: reader.i32(Field::TranscodeHeight),
        bitrate: reader.i64(Field::TranscodeBitrate),
    }
}
