//! UTC datetime conversions.
//!
//! BSON datetimes are signed milliseconds since the Unix epoch. These helpers
//! convert between that representation, `chrono::DateTime<Utc>`, and
//! RFC 3339 strings.

use chrono::{DateTime, SecondsFormat, Utc};

/// Error type for RFC 3339 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeParseError {
    pub message: String,
}

impl std::fmt::Display for DateTimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DateTimeParseError {}

/// Converts a datetime to milliseconds since the epoch.
///
/// Sub-millisecond precision is truncated toward negative infinity, so the
/// result always round-trips through [`millis_to_datetime`].
pub fn datetime_to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// Converts milliseconds since the epoch to a datetime.
///
/// Returns `None` if the value is outside chrono's representable range.
pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// Formats milliseconds since the epoch as RFC 3339 in UTC.
///
/// Out-of-range values are rendered as the raw millisecond count.
pub fn format_millis_rfc3339(ms: i64) -> String {
    match millis_to_datetime(ms) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => format!("{ms}ms"),
    }
}

/// Parses an RFC 3339 string with any offset into milliseconds since the epoch.
pub fn parse_rfc3339_millis(s: &str) -> Result<i64, DateTimeParseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| datetime_to_millis(dt.with_timezone(&Utc)))
        .map_err(|e| DateTimeParseError {
            message: format!("Invalid RFC 3339 datetime {s:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_millis_roundtrip() {
        for ms in [0i64, 1, -1, 1_388_701_067_000, -62_135_596_800_000] {
            let dt = millis_to_datetime(ms).unwrap();
            assert_eq!(datetime_to_millis(dt), ms);
        }
    }

    #[test]
    fn test_sub_millisecond_truncated() {
        let dt = Utc.with_ymd_and_hms(2014, 1, 2, 20, 17, 47).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(datetime_to_millis(dt), 1_388_693_867_123);
    }

    #[test]
    fn test_parse_with_offset() {
        // 22:17:47 CEST is 20:17:47 UTC
        let ms = parse_rfc3339_millis("2014-01-02T22:17:47+02:00").unwrap();
        assert_eq!(ms, 1_388_693_867_000);
        assert_eq!(format_millis_rfc3339(ms), "2014-01-02T20:17:47.000Z");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_rfc3339_millis("2014-13-02T00:00:00Z").is_err());
        assert!(parse_rfc3339_millis("yesterday").is_err());
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(millis_to_datetime(i64::MAX), None);
        assert_eq!(format_millis_rfc3339(i64::MAX), format!("{}ms", i64::MAX));
    }
}
