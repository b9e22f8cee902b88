use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::analyzers::day_type::{HolidayCalendar, HolidaySet, classify_day_type};
use crate::error::Result;
use crate::normalize::floor_to_hour;
use crate::records::{TrafficRecord, WeatherRecord};

/// Loads the merged traffic dataset with timestamps floored to the hour.
#[instrument]
pub fn load_canonical_traffic(path: &Path) -> Result<Vec<TrafficRecord>> {
    let mut rows: Vec<TrafficRecord> = load_rows(path)?;
    for row in &mut rows {
        row.timestamp = floor_to_hour(row.timestamp);
    }
    info!(rows = rows.len(), "Traffic dataset loaded");
    Ok(rows)
}

/// Loads the merged weather dataset with timestamps floored to the hour.
#[instrument]
pub fn load_canonical_weather(path: &Path) -> Result<Vec<WeatherRecord>> {
    let mut rows: Vec<WeatherRecord> = load_rows(path)?;
    for row in &mut rows {
        row.timestamp = floor_to_hour(row.timestamp);
    }
    info!(rows = rows.len(), "Weather dataset loaded");
    Ok(rows)
}

fn load_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result?;
        rows.push(record);
    }
    Ok(rows)
}

/// Fills the derived `day_type` of every traffic and weather record.
///
/// Holidays are taken for every year spanned by the two datasets together.
/// Returns the holiday set that was used.
pub fn annotate_day_types(
    traffic: &mut [TrafficRecord],
    weather: &mut [WeatherRecord],
    calendar: &impl HolidayCalendar,
) -> HolidaySet {
    let timestamps = traffic
        .iter()
        .map(|r| r.timestamp)
        .chain(weather.iter().map(|r| r.timestamp));
    let Some((start, end)) = span(timestamps) else {
        return HolidaySet::default();
    };

    let holidays = HolidaySet::for_span(calendar, start, end);
    debug!(%start, %end, holidays = holidays.len(), "Holiday set built");

    for record in traffic.iter_mut() {
        record.day_type = Some(classify_day_type(record.timestamp.date(), &holidays));
    }
    for record in weather.iter_mut() {
        record.day_type = Some(classify_day_type(record.timestamp.date(), &holidays));
    }
    holidays
}

fn span(timestamps: impl Iterator<Item = NaiveDateTime>) -> Option<(NaiveDateTime, NaiveDateTime)> {
    timestamps.fold(None, |acc, ts| match acc {
        None => Some((ts, ts)),
        Some((lo, hi)) => Some((lo.min(ts), hi.max(ts))),
    })
}
