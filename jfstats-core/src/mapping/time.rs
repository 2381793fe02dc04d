use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use jfstats_model::TICKS_PER_SECOND;

/// Integer seconds represented by a tick count.
pub fn ticks_to_seconds(ticks: i64) -> i64 {
    ticks / TICKS_PER_SECOND
}

pub fn seconds_to_ticks(seconds: i64) -> i64 {
    seconds.saturating_mul(TICKS_PER_SECOND)
}

/// `round(position / runtime * 100)`, or 0 when the runtime is unknown or zero.
pub fn progress_percent(position_ticks: i64, runtime_ticks: i64) -> f64 {
    if runtime_ticks <= 0 {
        return 0.0;
    }
    let percent = (position_ticks as f64 / runtime_ticks as f64 * 100.0).round();
    percent.clamp(0.0, 100.0)
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_hms(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    // Values past year 5138 in seconds are far more likely milliseconds.
    if value.abs() >= 100_000_000_000 {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

/// Accepts RFC 3339 (any fraction length), naive `YYYY-MM-DD HH:MM:SS[.f]`
/// and `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC), and epoch seconds or
/// milliseconds.
pub fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    input.parse::<i64>().ok().and_then(from_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn zero_runtime_never_divides() {
        assert_eq!(progress_percent(123_456, 0), 0.0);
        assert_eq!(progress_percent(0, 0), 0.0);
        assert_eq!(progress_percent(5, -1), 0.0);
    }

    #[test]
    fn progress_rounds_to_whole_percent() {
        assert_eq!(progress_percent(1, 3), 33.0);
        assert_eq!(progress_percent(2, 3), 67.0);
        assert_eq!(progress_percent(10, 10), 100.0);
    }

    #[test]
    fn hms_uses_integer_division() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(3_661), "01:01:01");
        assert_eq!(format_hms(90_000), "25:00:00");
        assert_eq!(ticks_to_seconds(seconds_to_ticks(754)), 754);
    }

    #[test]
    fn parses_the_timestamp_shapes_seen_in_exports() {
        let jellyfin = parse_datetime("2024-01-02T03:04:05.1234567Z").expect("jellyfin");
        assert_eq!(jellyfin.second(), 5);

        let sqlite = parse_datetime("2024-01-02 03:04:05").expect("sqlite");
        assert_eq!(sqlite.hour(), 3);

        let offset = parse_datetime("2024-01-02T05:04:05+02:00").expect("offset");
        assert_eq!(offset.hour(), 3);

        let seconds = parse_datetime("1704164645").expect("epoch seconds");
        let millis = parse_datetime("1704164645000").expect("epoch millis");
        assert_eq!(seconds, millis);

        assert!(parse_datetime("yesterday").is_none());
        assert!(parse_datetime("").is_none());
    }
}
