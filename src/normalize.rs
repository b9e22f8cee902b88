//! Field normalization rules for raw snapshot cells.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};

/// Marker the traffic source appends to delays that are ahead of schedule.
pub const AHEAD_OF_SCHEDULE: &str = "przed czasem";

/// Cell spellings the source exports use for "no value".
const MISSING_MARKERS: &[&str] = &[
    "", "NaN", "nan", "-NaN", "-nan", "NA", "N/A", "n/a", "<NA>", "NULL", "null", "None",
];

/// Returns `true` if a raw cell holds no value.
pub fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

/// Canonicalizes a brigade code.
///
/// Purely numeric codes (`"181"`, `"0181"`, `"181.0"`) become their decimal
/// integer form; anything else (`"M1"`) is returned unchanged.
pub fn normalize_brigade(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return raw.to_string();
    }

    match digits.trim_start_matches('0') {
        "" => "0".to_string(),
        significant => significant.to_string(),
    }
}

/// Parses a delay cell into signed minutes using the default marker.
///
/// `"12"` is 12 minutes late, `"5 przed czasem"` is 5 minutes early (-5).
pub fn normalize_delay(raw: &str) -> Result<i64> {
    normalize_delay_marked(raw, AHEAD_OF_SCHEDULE)
}

/// Parses a delay cell, negating it when `ahead_marker` occurs in the text.
pub fn normalize_delay_marked(raw: &str, ahead_marker: &str) -> Result<i64> {
    let minutes: i64 = raw
        .split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| Error::parse("delay", raw))?;

    if raw.contains(ahead_marker) {
        Ok(-minutes)
    } else {
        Ok(minutes)
    }
}

/// The source marks off-route reports by the presence of any value.
pub fn normalize_outside(raw: Option<&str>) -> bool {
    raw.is_some_and(|cell| !is_missing(cell))
}

/// Lenient numeric coercion: anything that is not a finite number is missing.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    if is_missing(raw) {
        return None;
    }
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Spellings carrying a UTC offset, e.g. `2025-01-03 08:00:00+01:00`.
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Parses the timestamp spellings found in raw and canonical files.
///
/// Offset-qualified timestamps keep their local wall-clock time; the offset
/// is dropped.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim().trim_end_matches('Z');
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            OFFSET_TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(trimmed, fmt).ok())
                .map(|ts| ts.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok_or_else(|| Error::parse("timestamp", raw))
}

/// Truncates a timestamp to the start of its hour.
pub fn floor_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

/// Builds an hourly timestamp from a measurement date and hour cell.
///
/// The hour is zero-padded to two digits before combining, so `"8"` and
/// `"08"` are equivalent.
pub fn weather_timestamp(date: &str, hour: &str) -> Result<NaiveDateTime> {
    let date = parse_timestamp(date)
        .map(|ts| ts.date())
        .map_err(|_| Error::parse("measurement date", date))?;
    let hour_digits = hour.trim();
    let padded = format!("{:0>2}", hour_digits.strip_suffix(".0").unwrap_or(hour_digits));
    let time = NaiveTime::parse_from_str(&format!("{padded}:00:00"), "%H:%M:%S")
        .map_err(|_| Error::parse("measurement hour", hour))?;
    Ok(date.and_time(time))
}
