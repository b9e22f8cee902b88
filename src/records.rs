//! Canonical record types stored in the merged datasets.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

use crate::normalize::parse_timestamp;
use crate::schema::{DayType, TrafficColumn, WeatherColumn};

/// One normalized vehicle delay report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrafficRecord {
    pub vehicle_no: String,
    pub brigade: String,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub stop: Option<String>,
    /// Signed minutes; negative means ahead of schedule.
    pub delay_minutes: i64,
    pub outside_route: bool,
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: NaiveDateTime,
    /// Derived in memory, never persisted.
    #[serde(skip)]
    pub day_type: Option<DayType>,
}

impl TrafficRecord {
    pub const HEADER: [&'static str; 7] = [
        "vehicle_no",
        "brigade",
        "route",
        "stop",
        "delay_minutes",
        "outside_route",
        "timestamp",
    ];
}

/// One hourly weather observation. Missing measurements are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: NaiveDateTime,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall: Option<f64>,
    pub pressure: Option<f64>,
    #[serde(skip)]
    pub day_type: Option<DayType>,
}

impl WeatherRecord {
    pub const HEADER: [&'static str; 6] = [
        "timestamp",
        "temperature",
        "wind_speed",
        "humidity",
        "rainfall",
        "pressure",
    ];

    /// Value of a measurement column; `None` for missing cells and for the
    /// non-measurement columns.
    pub fn measurement(&self, column: WeatherColumn) -> Option<f64> {
        match column {
            WeatherColumn::Temperature => self.temperature,
            WeatherColumn::WindSpeed => self.wind_speed,
            WeatherColumn::Humidity => self.humidity,
            WeatherColumn::Rainfall => self.rainfall,
            WeatherColumn::Pressure => self.pressure,
            WeatherColumn::Timestamp | WeatherColumn::DayType => None,
        }
    }

    /// The five covariates in [`WeatherColumn::MEASUREMENTS`] order.
    pub fn measurements(&self) -> [Option<f64>; 5] {
        WeatherColumn::MEASUREMENTS.map(|c| self.measurement(c))
    }

    /// Hashable identity of the row; floats compare by bit pattern.
    pub(crate) fn dedup_key(&self) -> (NaiveDateTime, [Option<u64>; 5]) {
        (self.timestamp, self.measurements().map(|m| m.map(f64::to_bits)))
    }
}

/// Value of a categorical column of a traffic record, as a grouping key.
pub fn traffic_key(record: &TrafficRecord, column: TrafficColumn) -> Option<String> {
    match column {
        TrafficColumn::VehicleNo => Some(record.vehicle_no.clone()),
        TrafficColumn::Brigade => Some(record.brigade.clone()),
        TrafficColumn::Route => record.route.clone(),
        TrafficColumn::Stop => record.stop.clone(),
        TrafficColumn::Outside => Some(record.outside_route.to_string()),
        TrafficColumn::DayType => record.day_type.map(|d| d.label().to_string()),
        TrafficColumn::Timestamp => Some(record.timestamp.to_string()),
        TrafficColumn::Delay => Some(record.delay_minutes.to_string()),
    }
}

/// Drops repeated rows, keeping the first occurrence of each key.
pub fn dedup_by_key<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|row| seen.insert(key(row))).collect()
}

fn de_timestamp<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
