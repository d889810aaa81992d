//! Run identifier timestamps.
//!
//! Run ids are written as `<pid>_<unix-seconds>`. The token after the last
//! underscore is read as a Unix timestamp when it parses and is plausible.

use crate::error::FilterError;
use chrono::{DateTime, NaiveDate, Utc};

/// Smallest accepted timestamp (2001-09-09). Smaller tokens are pids or counters.
pub const MIN_PLAUSIBLE_TIMESTAMP: i64 = 1_000_000_000;

/// Seconds added to a date-range end so the whole end day is included.
pub const END_OF_DAY_SECS: i64 = 86_400;

/// Extract the Unix timestamp encoded in a run id.
///
/// Returns `None` when there is no underscore, the trailing token is not
/// all digits, or the value is too small to be a post-2001 date.
pub fn run_timestamp(run_id: &str) -> Option<i64> {
    let (_, tail) = run_id.rsplit_once('_')?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse::<i64>()
        .ok()
        .filter(|ts| *ts >= MIN_PLAUSIBLE_TIMESTAMP)
}

/// Format a timestamp as `YYYY-MM-DD` (UTC).
pub fn format_date(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Parse `YYYY-MM-DD` into the Unix timestamp of that day's midnight (UTC).
pub fn parse_date(date: &str) -> Result<i64, FilterError> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| FilterError::InvalidDate(date.to_string()))?;
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| FilterError::InvalidDate(date.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_then_seconds() {
        assert_eq!(run_timestamp("12345_1700000000"), Some(1_700_000_000));
    }

    #[test]
    fn test_last_underscore_wins() {
        assert_eq!(run_timestamp("host_a_99_1706284800"), Some(1_706_284_800));
    }

    #[test]
    fn test_no_numeric_tail() {
        assert_eq!(run_timestamp("unknown_run"), None);
        assert_eq!(run_timestamp("1700000000"), None);
        assert_eq!(run_timestamp("12345_"), None);
        assert_eq!(run_timestamp("12345_17000x0000"), None);
        assert_eq!(run_timestamp("12345_-1700000000"), None);
    }

    #[test]
    fn test_implausible_values() {
        assert_eq!(run_timestamp("1_42"), None);
        assert_eq!(run_timestamp("1_999999999"), None);
        assert_eq!(run_timestamp("1_99999999999999999999999"), None);
    }

    #[test]
    fn test_date_round_trip() {
        let ts = parse_date("2023-11-14").unwrap();
        assert_eq!(ts, 1_699_920_000);
        assert_eq!(format_date(1_700_000_000).as_deref(), Some("2023-11-14"));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(
            parse_date("14/11/2023"),
            Err(FilterError::InvalidDate("14/11/2023".to_string()))
        );
    }
}
