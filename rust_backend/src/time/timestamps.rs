use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::core::domain::TimeWindow;

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a detection-log timestamp into UTC.
///
/// Accepted forms, tried in order:
/// * RFC 3339 (`2025-09-05T10:00:00Z`, `2025-09-05T12:00:00+02:00`)
/// * Naive date-time, interpreted as UTC (`2025-09-05 10:00:00`, fractional seconds allowed)
/// * Bare date, interpreted as midnight UTC (`2025-09-05`)
///
/// # Example
/// ```
/// use trackway_analysis::time::parse_timestamp;
/// let ts = parse_timestamp("2025-09-05 10:00:01").unwrap();
/// assert_eq!(ts.timestamp(), 1757066401);
/// ```
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Empty timestamp".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(format!("Unrecognised timestamp: '{}'", trimmed))
}

/// Format a timestamp the way the detection log stores it.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Build a `[start, end)` window from optional textual bounds.
pub fn parse_time_window(start: Option<&str>, end: Option<&str>) -> Result<TimeWindow, String> {
    let start = start.map(parse_timestamp).transpose()?;
    let end = end.map(parse_timestamp).transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            return Err(format!("Window end {} precedes start {}", e, s));
        }
    }
    Ok(TimeWindow::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 9, 5, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-09-05 10:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-09-05T10:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-09-05T10:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-09-05T12:00:00+02:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2025-09-05").unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let ts = parse_timestamp("2025-09-05 10:00:00.5").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_format_round_trip() {
        let ts = Utc.with_ymd_and_hms(2025, 9, 5, 10, 0, 1).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_parse_time_window() {
        let window = parse_time_window(Some("2025-09-05"), None).unwrap();
        assert!(window.start.is_some());
        assert!(window.end.is_none());
        assert!(parse_time_window(Some("2025-09-06"), Some("2025-09-05")).is_err());
    }
}
