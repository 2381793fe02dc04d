use jfstats_model::{PlayMethod, Session, SourceFormat, UNKNOWN_USER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::fields::{Field, FieldReader};
use super::{MappingResult, derived_id, end_after};

/// Column order of the plugin's TSV export.
pub const TSV_COLUMNS: [&str; 9] = [
    "timestamp",
    "userId",
    "itemId",
    "itemType",
    "itemName",
    "playMethod",
    "clientName",
    "deviceName",
    "playDuration",
];

static EPISODE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)\s+-\s+s(\d+)e(\d+)\s+-\s+(.+)$")
        .expect("episode name regex should compile")
});

/// `"<Series> - sNNeNN - <Title>"` split into series name and season number.
pub fn parse_episode_name(name: &str) -> Option<(String, u32)> {
    let captures = EPISODE_NAME_PATTERN.captures(name.trim())?;
    let series = captures.get(1)?.as_str().trim().to_string();
    let season = captures.get(2)?.as_str().parse().ok()?;
    Some((series, season))
}

/// Builds a JSON object keyed by [`TSV_COLUMNS`]. `None` when the line has
/// fewer columns than the export format defines.
pub fn tsv_line_to_record(line: &str) -> Option<Value> {
    let columns: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if columns.len() < TSV_COLUMNS.len() {
        return None;
    }
    let record: Map<String, Value> = TSV_COLUMNS
        .iter()
        .zip(columns)
        .map(|(key, value)| ((*key).to_string(), Value::String(value.to_string())))
        .collect();
    Some(Value::Object(record))
}

/// True for the header line some exports start with.
pub fn is_tsv_header(line: &str) -> bool {
    line.split('\t')
        .next()
        .map(|first| {
            let first = first.trim().to_ascii_lowercase();
            first == "timestamp" || first == "datecreated" || first == "date_created"
        })
        .unwrap_or(false)
}

pub(super) fn map(record: &Value, server_id: i32) -> MappingResult {
    let reader = FieldReader::new(record, SourceFormat::PlaybackReporting);
    let Some(start) = reader.datetime(Field::StartTime) else {
        return Ok(None);
    };

    let user_id = reader.str(Field::UserId);
    let item_id = reader.str(Field::ItemId);
    let id = derived_id(&[
        "playback-reporting",
        &start.timestamp_millis().to_string(),
        user_id.as_deref().unwrap_or_default(),
        item_id.as_deref().unwrap_or_default(),
    ]);

    let mut session = Session::new(id, server_id);
    let duration = reader.i64(Field::Duration).unwrap_or(0).max(0);
    let item_name = reader.str(Field::ItemName);
    let episode = item_name.as_deref().and_then(parse_episode_name);

    session.user_id = user_id;
    session.user_name = reader.str(Field::UserName).unwrap_or_else(|| UNKNOWN_USER.to_string());
    session.item_id = item_id;
    session.series_name = episode.as_ref().map(|(series, _)| series.clone());
    session.season_id = episode.as_ref().map(|(_, season)| format!("S{season:02}"));
    session.item_name = item_name;
    session.client_name = reader.str(Field::ClientName);
    session.device_name = reader.str(Field::DeviceName);
    session.start_time = Some(start);
    session.end_time = end_after(Some(start), duration)?;
    session.last_activity_date = session.end_time;
    session.play_duration = duration;
    // The plugin only logs plays that actually ran.
    session.completed = duration > 0;
    session.play_method = reader
        .str(Field::PlayMethod)
        .and_then(|label| PlayMethod::from_label(&label));
    session.is_transcoded = session.play_method == Some(PlayMethod::Transcode);
    session.raw_data = record.clone();

    Ok(Some(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const ROW: &str =
        "2024-05-01T10:00:00Z\tu1\ti1\tEpisode\tShow - s01e02 - Title\tDirectPlay\tWeb\tChrome\t600";

    #[test]
    fn maps_a_tsv_row() {
        let record = tsv_line_to_record(ROW).expect("nine columns");
        let session = map(&record, 3).expect("map").expect("session");

        assert_eq!(session.series_name.as_deref(), Some("Show"));
        assert_eq!(session.season_id.as_deref(), Some("S01"));
        assert_eq!(session.item_name.as_deref(), Some("Show - s01e02 - Title"));
        assert_eq!(session.play_duration, 600);
        assert!(session.completed);
        assert_eq!(session.client_name.as_deref(), Some("Web"));
        assert_eq!(session.device_name.as_deref(), Some("Chrome"));
        assert_eq!(session.play_method, Some(PlayMethod::DirectPlay));
        assert_eq!(
            session.end_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 10, 0).unwrap())
        );
    }

    #[test]
    fn short_lines_are_rejected() {
        assert!(tsv_line_to_record("2024-05-01T10:00:00Z\tu1\ti1").is_none());
    }

    #[test]
    fn headers_are_recognised() {
        assert!(is_tsv_header("Timestamp\tUserId\tItemId"));
        assert!(!is_tsv_header(ROW));
    }

    #[test]
    fn json_key_variants_map_identically() {
        let camel = json!({ "timestamp": "2024-05-01 10:00:00", "userId": "u1", "itemId": "i1", "playDuration": 60 });
        let snake = json!({ "timestamp": "2024-05-01 10:00:00", "user_id": "u1", "item_id": "i1", "play_duration": "60" });
        let pascal = json!({ "Timestamp": "2024-05-01 10:00:00", "UserId": "u1", "ItemId": "i1", "PlayDuration": 60 });

        let ids: Vec<String> = [camel, snake, pascal]
            .iter()
            .map(|record| map(record, 1).expect("map").expect("session"))
            .inspect(|session| assert_eq!(session.play_duration, 60))
            .map(|session| session.id)
            .collect();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[1], ids[2]);
    }

    #[test]
    fn unparseable_timestamp_is_skipped() {
        let record = json!({ "timestamp": "last tuesday", "userId": "u1" });
        assert_eq!(map(&record, 1), Ok(None));
    }

    #[test]
    fn plain_titles_leave_series_empty() {
        assert_eq!(parse_episode_name("The Matrix"), None);
        assert_eq!(
            parse_episode_name("Some Show - S10E01 - Finale"),
            Some(("Some Show".to_string(), 10))
        );
    }
}
