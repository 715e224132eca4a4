//! # Time Normalizer
//!
//! Converts business-local wall-clock date/time plus an IANA time zone into
//! absolute UTC instants.
//!
//! Everything downstream of this module works in UTC with the `[start, end)`
//! convention; local time exists only at this boundary.
//!
//! ## DST Policy
//! - A local time that occurs twice (fall-back hour) resolves to the
//!   **earlier** instant. Deterministic: identical inputs always produce the
//!   identical instant.
//! - A local time that never occurs (spring-forward gap) is rejected with
//!   `InvalidDateTime` — the caller typed a time that does not exist in
//!   that zone on that date.
//!
//! No function here reads the ambient clock.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, CoreResult};
use crate::types::TimeWindow;

// =============================================================================
// Normalization
// =============================================================================

/// Resolves a local calendar date and wall-clock time in `iana_zone` to a
/// single UTC instant.
///
/// ## Errors
/// - `InvalidTimeZone` if the zone identifier is unrecognized.
/// - `InvalidDateTime` if the local time falls in a DST gap.
pub fn normalize(local_date: NaiveDate, local_time: NaiveTime, iana_zone: &str) -> CoreResult<DateTime<Utc>> {
    let tz = parse_zone(iana_zone)?;
    let naive = local_date.and_time(local_time);

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // Fall-back hour: two valid instants; pick the earlier one.
        LocalResult::Ambiguous(earlier, _later) => Ok(earlier.with_timezone(&Utc)),
        // Spring-forward gap: this wall-clock time never happened.
        LocalResult::None => Err(CoreError::InvalidDateTime {
            reason: format!("{} does not exist in zone {}", naive, iana_zone),
        }),
    }
}

/// Resolves a local start/end pair into a validated UTC [`TimeWindow`].
///
/// `end_date` defaults to `start_date`, so a plain same-day rental needs
/// only one date; an overnight rental passes the checkout date explicitly.
pub fn normalize_window(
    start_date: NaiveDate,
    start_time: NaiveTime,
    end_date: Option<NaiveDate>,
    end_time: NaiveTime,
    iana_zone: &str,
) -> CoreResult<TimeWindow> {
    let start = normalize(start_date, start_time, iana_zone)?;
    let end = normalize(end_date.unwrap_or(start_date), end_time, iana_zone)?;
    Ok(TimeWindow::new(start, end)?)
}

/// Parses an IANA zone identifier.
pub fn parse_zone(iana_zone: &str) -> CoreResult<Tz> {
    iana_zone
        .parse::<Tz>()
        .map_err(|_| CoreError::InvalidTimeZone(iana_zone.to_string()))
}

// =============================================================================
// String Parsing Helpers
// =============================================================================

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_local_date(value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| CoreError::InvalidDateTime {
        reason: format!("'{}' is not a YYYY-MM-DD date", value),
    })
}

/// Parses a 24h `HH:MM` (or `HH:MM:SS`) wall-clock time.
pub fn parse_local_time(value: &str) -> CoreResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| CoreError::InvalidDateTime {
            reason: format!("'{}' is not a 24h HH:MM time", value),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_normalize_plain_offset() {
        // Chicago is UTC-5 in June (CDT).
        let instant = normalize(d(2026, 6, 15), t(10, 0), "America/Chicago").unwrap();
        assert_eq!(instant.hour(), 15);
        assert_eq!(instant.minute(), 0);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let a = normalize(d(2026, 6, 15), t(10, 0), "America/Chicago").unwrap();
        let b = normalize(d(2026, 6, 15), t(10, 0), "America/Chicago").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_zone_rejected() {
        let err = normalize(d(2026, 6, 15), t(10, 0), "America/Springfield").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimeZone(_)));
    }

    #[test]
    fn test_dst_gap_rejected() {
        // US spring-forward 2026: 02:30 on March 8 never happens in Chicago.
        let err = normalize(d(2026, 3, 8), t(2, 30), "America/Chicago").unwrap_err();
        assert!(matches!(err, CoreError::InvalidDateTime { .. }));
    }

    #[test]
    fn test_dst_ambiguity_resolves_to_earlier() {
        // US fall-back 2026: 01:30 on November 1 happens twice in Chicago.
        // The earlier occurrence is still CDT (UTC-5), i.e. 06:30 UTC.
        let instant = normalize(d(2026, 11, 1), t(1, 30), "America/Chicago").unwrap();
        assert_eq!(instant.hour(), 6);
        assert_eq!(instant.minute(), 30);
    }

    #[test]
    fn test_normalize_window_same_day() {
        let w = normalize_window(d(2026, 6, 15), t(10, 0), None, t(17, 0), "UTC").unwrap();
        assert_eq!(w.duration(), chrono::Duration::hours(7));
    }

    #[test]
    fn test_normalize_window_overnight() {
        let w = normalize_window(
            d(2026, 6, 15),
            t(17, 0),
            Some(d(2026, 6, 16)),
            t(9, 0),
            "UTC",
        )
        .unwrap();
        assert_eq!(w.duration(), chrono::Duration::hours(16));
    }

    #[test]
    fn test_normalize_window_rejects_inverted() {
        let err = normalize_window(d(2026, 6, 15), t(17, 0), None, t(10, 0), "UTC").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_local_date("2026-06-15").is_ok());
        assert!(parse_local_date("15/06/2026").is_err());
        assert_eq!(parse_local_time("09:30").unwrap(), t(9, 30));
        assert!(parse_local_time("9:30pm").is_err());
    }
}
