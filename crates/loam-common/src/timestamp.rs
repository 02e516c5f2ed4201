//! Timestamp handling for journal lines and replayed commands.
//!
//! Journal lines carry RFC 3339 instants. Replayed entry-creating commands
//! receive the compact `touch -t` form (`YYMMDDHHMM`), which only has minute
//! resolution.

use crate::error::TimestampError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};

/// `strftime` pattern of the historical-timestamp argument.
pub const TOUCH_STAMP_FORMAT: &str = "%y%m%d%H%M";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an instant as written by the activity log or the journal.
///
/// Offsets other than UTC are converted. Naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError::Unrecognised(raw.to_string()))
}

/// Render an instant the way it is stored in a journal line.
pub fn format_journal_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Render an instant as a `-t` argument (`YYMMDDHHMM`).
pub fn format_touch_stamp(ts: &DateTime<Utc>) -> String {
    ts.format(TOUCH_STAMP_FORMAT).to_string()
}

/// Parse a `-t` argument: `[[CC]YY]MMDDhhmm[.ss]` restricted to the forms
/// with an explicit year (`YYMMDDhhmm` and `CCYYMMDDhhmm`).
///
/// Two-digit years follow POSIX: 69..=99 are 19xx, 00..=68 are 20xx.
pub fn parse_touch_stamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let unrecognised = || TimestampError::Unrecognised(raw.to_string());

    let (digits, seconds) = match raw.split_once('.') {
        Some((digits, secs)) => (digits, Some(secs)),
        None => (raw, None),
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unrecognised());
    }

    let field = |range: std::ops::Range<usize>| -> Result<u32, TimestampError> {
        digits
            .get(range)
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(unrecognised)
    };

    let (year, rest) = match digits.len() {
        10 => {
            let yy = field(0..2)? as i32;
            (if yy >= 69 { 1900 + yy } else { 2000 + yy }, 2)
        }
        12 => (field(0..4)? as i32, 4),
        _ => return Err(unrecognised()),
    };
    let month = field(rest..rest + 2)?;
    let day = field(rest + 2..rest + 4)?;
    let hour = field(rest + 4..rest + 6)?;
    let minute = field(rest + 6..rest + 8)?;
    let second = match seconds {
        Some(s) if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse::<u32>().map_err(|_| unrecognised())?
        }
        Some(_) => return Err(unrecognised()),
        None => 0,
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError::OutOfRange(raw.to_string()))
}

/// Drop seconds and sub-second precision, matching what survives a
/// `-t` round trip.
pub fn truncate_to_minute(ts: &DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*ts)
}
