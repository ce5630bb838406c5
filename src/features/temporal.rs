// Timestamp parsing for the temporal and account-age features.
//
// Datasets and clients disagree on timestamp formats, so parsing tries a
// short list of known shapes. Anything that doesn't parse is treated exactly
// like a missing field; it never raises.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Formats with a time component and no offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Legacy Twitter API format, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const TWITTER_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Parse a timestamp into wall-clock time. Offsets are honoured: the result
/// is the local time at the given offset, matching what a person in that
/// zone saw on the clock.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    parse_with_offset(raw).map(|dt| dt.naive_local())
}

/// Parse a timestamp into the instant it names. Timestamps without an
/// offset are read as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    parse_with_offset(raw).map(|dt| dt.with_timezone(&Utc))
}

fn parse_with_offset(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, TWITTER_FORMAT) {
        return Some(dt);
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc().fixed_offset());
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().fixed_offset());
        }
    }
    None
}

/// Hour of day, 0-23.
pub fn hour_of(ts: &NaiveDateTime) -> u32 {
    ts.hour()
}

/// Day of week with Monday = 0.
pub fn day_of_week(ts: &NaiveDateTime) -> u32 {
    ts.weekday().num_days_from_monday()
}

/// Whole days from `created` to `now`.
pub fn days_between(created: &DateTime<Utc>, now: &DateTime<Utc>) -> i64 {
    now.signed_duration_since(*created).num_days()
}
