//! Timestamp helpers.
//!
//! All timestamps are stored as RFC3339 UTC text with millisecond precision
//! and a `Z` suffix. The fixed width keeps lexical order equal to time order,
//! which the range queries and `substr(created_at, 1, 10)` day grouping rely on.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Midnight UTC of the current day.
pub fn start_of_today() -> String {
    midnight(Utc::now().date_naive())
}

/// Midnight UTC of the first day of the current month.
pub fn start_of_month() -> String {
    let today = Utc::now().date_naive();
    let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    midnight(first)
}

pub fn days_ago(days: i64) -> String {
    format_timestamp(Utc::now() - Duration::days(days))
}

fn midnight(date: NaiveDate) -> String {
    format_timestamp(date.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_fixed_width_and_sortable() {
        let earlier = format_timestamp(Utc::now() - Duration::seconds(5));
        let later = now_timestamp();
        assert_eq!(earlier.len(), later.len());
        assert!(earlier < later);
        assert!(later.ends_with('Z'));
    }

    #[test]
    fn day_boundaries_precede_now() {
        let now = now_timestamp();
        assert!(start_of_month() <= start_of_today());
        assert!(start_of_today() <= now);
        assert!(start_of_today().ends_with("T00:00:00.000Z"));
        assert_eq!(&start_of_month()[8..10], "01");
        assert!(days_ago(30) < now);
    }
}
