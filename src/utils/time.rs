use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};

/// Format used for every human readable timestamp written by dailytrack.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(moment: NaiveDateTime) -> String {
    moment.format(TIMESTAMP_FORMAT).to_string()
}

/// Converts a wall-clock difference into something tokio can sleep for. Zero and negative
/// differences yield `None`.
pub fn positive_duration(delta: TimeDelta) -> Option<Duration> {
    delta.to_std().ok().filter(|v| !v.is_zero())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, TimeDelta};

    use super::{format_timestamp, positive_duration};

    #[test]
    fn test_timestamp_format() {
        let moment = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap();
        assert_eq!(format_timestamp(moment), "2024-06-01 09:05:03");
    }

    #[test]
    fn test_positive_duration() {
        assert_eq!(
            positive_duration(TimeDelta::minutes(2)),
            Some(Duration::from_secs(120))
        );
        assert_eq!(positive_duration(TimeDelta::zero()), None);
        assert_eq!(positive_duration(TimeDelta::seconds(-5)), None);
    }
}
