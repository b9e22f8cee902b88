//! Readers for raw per-hour traffic and weather CSV snapshots.
//!
//! Columns are located by header name through the [`ColumnSchema`], so files
//! whose column order differs (or that omit optional columns) read the same.

use csv::StringRecord;
use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};
use crate::normalize::is_missing;
use crate::schema::{TrafficHeaders, WeatherColumn, WeatherHeaders};

/// A raw row tagged with the file line it came from.
#[derive(Debug, Clone)]
pub struct RawRow<T> {
    pub line: u64,
    pub record: T,
}

/// A traffic snapshot row before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawDelayRecord {
    pub vehicle_no: String,
    pub brigade: String,
    pub route: Option<String>,
    pub stop: Option<String>,
    pub delay: String,
    pub outside: Option<String>,
    pub timestamp: String,
}

/// A weather snapshot row before timestamp construction and coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWeatherRecord {
    pub date: Option<String>,
    pub hour: Option<String>,
    /// Cells of the five measurements in [`WeatherColumn::MEASUREMENTS`] order.
    pub measurements: [Option<String>; 5],
}

struct HeaderIndex<'a> {
    path: &'a Path,
    headers: StringRecord,
}

impl<'a> HeaderIndex<'a> {
    fn optional(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn required(&self, name: &str) -> Result<usize> {
        self.optional(name).ok_or_else(|| Error::MissingColumn {
            path: self.path.to_path_buf(),
            column: name.to_string(),
        })
    }
}

fn cell(record: &StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .filter(|v| !is_missing(v))
        .map(str::to_string)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

/// Reads every row of a raw traffic snapshot.
pub fn read_traffic_snapshot(path: &Path, headers: &TrafficHeaders) -> Result<Vec<RawRow<RawDelayRecord>>> {
    let mut rdr = csv::Reader::from_reader(File::open(path)?);
    let index = HeaderIndex {
        path,
        headers: rdr.headers()?.clone(),
    };

    let vehicle_no = index.required(&headers.vehicle_no)?;
    let brigade = index.required(&headers.brigade)?;
    let delay = index.required(&headers.delay)?;
    let outside = index.required(&headers.outside)?;
    let timestamp = index.required(&headers.timestamp)?;
    let route = index.optional(&headers.route);
    let stop = index.optional(&headers.stop);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let text = |idx: usize| record.get(idx).unwrap_or_default().to_string();

        rows.push(RawRow {
            line: line_of(&record),
            record: RawDelayRecord {
                vehicle_no: text(vehicle_no),
                brigade: text(brigade),
                route: route.and_then(|i| cell(&record, i)),
                stop: stop.and_then(|i| cell(&record, i)),
                delay: text(delay),
                outside: cell(&record, outside),
                timestamp: text(timestamp),
            },
        });
    }

    Ok(rows)
}

/// Reads every row of a raw weather snapshot.
///
/// Station identifiers and wind direction are not read.
pub fn read_weather_snapshot(path: &Path, headers: &WeatherHeaders) -> Result<Vec<RawRow<RawWeatherRecord>>> {
    let mut rdr = csv::Reader::from_reader(File::open(path)?);
    let index = HeaderIndex {
        path,
        headers: rdr.headers()?.clone(),
    };

    let date = index.required(&headers.date)?;
    let hour = index.required(&headers.hour)?;
    let mut measurement_idx = [0usize; 5];
    for (slot, column) in measurement_idx.iter_mut().zip(WeatherColumn::MEASUREMENTS) {
        let name = headers.measurement(column).unwrap_or(column.raw_name());
        *slot = index.required(name)?;
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(RawRow {
            line: line_of(&record),
            record: RawWeatherRecord {
                date: cell(&record, date),
                hour: cell(&record, hour),
                measurements: measurement_idx.map(|i| cell(&record, i)),
            },
        });
    }

    Ok(rows)
}
