//! Timestamp parsing and day windows.
//!
//! Records arrive from the backend with ISO-8601 strings. They are parsed
//! here, once, into `DateTime<Utc>` before any streak math runs. Nothing in
//! this module reads the system clock; "now" is always an argument.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Zulu-suffixed forms that are valid ISO-8601 but not RFC 3339.
const NAIVE_UTC_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// Accepts RFC 3339 (`2024-01-01T08:00:00.000Z`, `2024-01-01T09:00:00+01:00`),
/// minute precision (`2024-01-01T08:00Z`) and bare dates (`2024-01-01`, read
/// as UTC midnight). Timestamps without an offset are rejected rather than
/// guessed.
///
/// # Errors
/// Returns [`ValidationError::InvalidTimestamp`] naming `record_id`.
pub fn parse_timestamp(record_id: &str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();

    let rfc_err = match DateTime::parse_from_rfc3339(trimmed) {
        Ok(dt) => return Ok(dt.with_timezone(&Utc)),
        Err(e) => e,
    };

    if let Some(naive) = trimmed.strip_suffix('Z') {
        for fmt in NAIVE_UTC_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, fmt) {
                return Ok(parsed.and_utc());
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M%:z") {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(ValidationError::InvalidTimestamp {
        record_id: record_id.to_string(),
        value: value.to_string(),
        reason: rfc_err.to_string(),
    })
}

/// Half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Build a window from explicit bounds.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidWindow`] if `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The local day containing `now`: `[local midnight, local midnight + 24h)`.
    ///
    /// When midnight does not exist locally (a DST gap), the window starts at
    /// the first valid hour of that date.
    pub fn local_day<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let date = now.date_naive();
        let start = (0..24)
            .find_map(|hour| {
                let local = date.and_hms_opt(hour, 0, 0)?;
                tz.from_local_datetime(&local).earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| now.with_timezone(&Utc));

        Self {
            start,
            end: start + Duration::hours(24),
        }
    }

    /// Whether `instant` falls inside the window. `end` is excluded.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn parses_rfc3339_with_millis() {
        let t = parse_timestamp("c1", "2024-01-01T08:00:00.000Z").unwrap();
        assert_eq!(t, utc(2024, 1, 1, 8, 0));
    }

    #[test]
    fn parses_offset_and_normalises_to_utc() {
        let t = parse_timestamp("c1", "2024-01-01T09:30:00+01:00").unwrap();
        assert_eq!(t, utc(2024, 1, 1, 8, 30));
    }

    #[test]
    fn parses_minute_precision_zulu() {
        let t = parse_timestamp("c1", "2024-01-02T08:00Z").unwrap();
        assert_eq!(t, utc(2024, 1, 2, 8, 0));
    }

    #[test]
    fn parses_bare_date_as_utc_midnight() {
        let t = parse_timestamp("c1", "2024-01-05").unwrap();
        assert_eq!(t, utc(2024, 1, 5, 0, 0));
    }

    #[test]
    fn rejects_garbage_and_names_record() {
        let err = parse_timestamp("c-9", "not a date").unwrap_err();
        match err {
            ValidationError::InvalidTimestamp { record_id, value, .. } => {
                assert_eq!(record_id, "c-9");
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_timestamp_without_offset() {
        assert!(parse_timestamp("c1", "2024-01-01T08:00:00").is_err());
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        let start = utc(2024, 1, 2, 0, 0);
        assert!(DayWindow::new(start, start).is_err());
        assert!(DayWindow::new(start, start - Duration::hours(1)).is_err());
    }

    #[test]
    fn window_is_half_open() {
        let w = DayWindow::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 2, 0, 0)).unwrap();
        assert!(w.contains(utc(2024, 1, 1, 0, 0)));
        assert!(w.contains(utc(2024, 1, 1, 23, 59)));
        assert!(!w.contains(utc(2024, 1, 2, 0, 0)));
    }

    #[test]
    fn local_day_uses_offset_midnight() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        // 2024-01-01 23:30 UTC is 08:30 on Jan 2 in UTC+9.
        let now = utc(2024, 1, 1, 23, 30).with_timezone(&tz);
        let w = DayWindow::local_day(&now);
        assert_eq!(w.start, utc(2024, 1, 1, 15, 0));
        assert_eq!(w.end, utc(2024, 1, 2, 15, 0));
    }
}
