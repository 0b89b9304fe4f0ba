//! Timestamp utilities

use chrono::{DateTime, TimeZone, Utc};

/// Convert Unix epoch milliseconds (the stored timestamp unit) to a UTC timestamp
///
/// Out-of-range values clamp to the Unix epoch.
pub fn from_epoch_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}

/// Calendar date used in human-readable summaries (`YYYY-MM-DD`)
pub fn short_date(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Whether two timestamps fall on the same UTC calendar day
pub fn same_day(a: &DateTime<Utc>, b: &DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}
