//! Column vocabulary shared by the mergers and the analysis functions.
//!
//! Raw snapshots use the source systems' header names, canonical datasets use
//! stable snake_case identifiers, and consumers label things with the Polish
//! display names. All three live here so they cannot drift apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw header names of the two input sources.
///
/// Deserializable from the `[schema]` section of the config file; every field
/// falls back to the built-in vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    pub traffic: TrafficHeaders,
    pub weather: WeatherHeaders,
    /// Substring marking a delay value as "ahead of schedule".
    pub ahead_of_schedule_marker: String,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            traffic: TrafficHeaders::default(),
            weather: WeatherHeaders::default(),
            ahead_of_schedule_marker: "przed czasem".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficHeaders {
    pub vehicle_no: String,
    pub brigade: String,
    pub route: String,
    pub stop: String,
    pub delay: String,
    pub outside: String,
    pub timestamp: String,
}

impl Default for TrafficHeaders {
    fn default() -> Self {
        Self {
            vehicle_no: TrafficColumn::VehicleNo.raw_name().to_string(),
            brigade: TrafficColumn::Brigade.raw_name().to_string(),
            route: TrafficColumn::Route.raw_name().to_string(),
            stop: TrafficColumn::Stop.raw_name().to_string(),
            delay: TrafficColumn::Delay.raw_name().to_string(),
            outside: TrafficColumn::Outside.raw_name().to_string(),
            timestamp: TrafficColumn::Timestamp.raw_name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherHeaders {
    pub date: String,
    pub hour: String,
    pub temperature: String,
    pub wind_speed: String,
    pub humidity: String,
    pub rainfall: String,
    pub pressure: String,
}

impl Default for WeatherHeaders {
    fn default() -> Self {
        Self {
            date: "data_pomiaru".to_string(),
            hour: "godzina_pomiaru".to_string(),
            temperature: WeatherColumn::Temperature.raw_name().to_string(),
            wind_speed: WeatherColumn::WindSpeed.raw_name().to_string(),
            humidity: WeatherColumn::Humidity.raw_name().to_string(),
            rainfall: WeatherColumn::Rainfall.raw_name().to_string(),
            pressure: WeatherColumn::Pressure.raw_name().to_string(),
        }
    }
}

impl WeatherHeaders {
    /// Raw header of a measurement column.
    pub fn measurement(&self, column: WeatherColumn) -> Option<&str> {
        match column {
            WeatherColumn::Temperature => Some(&self.temperature),
            WeatherColumn::WindSpeed => Some(&self.wind_speed),
            WeatherColumn::Humidity => Some(&self.humidity),
            WeatherColumn::Rainfall => Some(&self.rainfall),
            WeatherColumn::Pressure => Some(&self.pressure),
            WeatherColumn::Timestamp | WeatherColumn::DayType => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficColumn {
    VehicleNo,
    Brigade,
    Route,
    Stop,
    Delay,
    Outside,
    Timestamp,
    DayType,
}

impl TrafficColumn {
    /// Header in the raw per-hour snapshots. `DayType` is derived and has none
    /// in the source, so it reuses its canonical name.
    pub fn raw_name(self) -> &'static str {
        match self {
            TrafficColumn::VehicleNo => "Vehicle No",
            TrafficColumn::Brigade => "Brigade",
            TrafficColumn::Route => "Route",
            TrafficColumn::Stop => "Stop Name",
            TrafficColumn::Delay => "Delay",
            TrafficColumn::Outside => "Outside",
            TrafficColumn::Timestamp => "Timestamp",
            TrafficColumn::DayType => "day_type",
        }
    }

    pub fn canonical_name(self) -> &'static str {
        match self {
            TrafficColumn::VehicleNo => "vehicle_no",
            TrafficColumn::Brigade => "brigade",
            TrafficColumn::Route => "route",
            TrafficColumn::Stop => "stop",
            TrafficColumn::Delay => "delay_minutes",
            TrafficColumn::Outside => "outside_route",
            TrafficColumn::Timestamp => "timestamp",
            TrafficColumn::DayType => "day_type",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrafficColumn::VehicleNo => "Numer pojazdu",
            TrafficColumn::Brigade => "Brygada",
            TrafficColumn::Route => "Linia",
            TrafficColumn::Stop => "Przystanek",
            TrafficColumn::Delay => "Opóźnienie",
            TrafficColumn::Outside => "Poza trasą",
            TrafficColumn::Timestamp => "Timestamp",
            TrafficColumn::DayType => "Typ dnia",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherColumn {
    Temperature,
    WindSpeed,
    Humidity,
    Rainfall,
    Pressure,
    Timestamp,
    DayType,
}

impl WeatherColumn {
    /// The five measurement columns, in covariate order.
    pub const MEASUREMENTS: [WeatherColumn; 5] = [
        WeatherColumn::Temperature,
        WeatherColumn::WindSpeed,
        WeatherColumn::Humidity,
        WeatherColumn::Rainfall,
        WeatherColumn::Pressure,
    ];

    pub fn raw_name(self) -> &'static str {
        match self {
            WeatherColumn::Temperature => "temperatura",
            WeatherColumn::WindSpeed => "predkosc_wiatru",
            WeatherColumn::Humidity => "wilgotnosc_wzgledna",
            WeatherColumn::Rainfall => "suma_opadu",
            WeatherColumn::Pressure => "cisnienie",
            WeatherColumn::Timestamp => "timestamp",
            WeatherColumn::DayType => "day_type",
        }
    }

    pub fn canonical_name(self) -> &'static str {
        match self {
            WeatherColumn::Temperature => "temperature",
            WeatherColumn::WindSpeed => "wind_speed",
            WeatherColumn::Humidity => "humidity",
            WeatherColumn::Rainfall => "rainfall",
            WeatherColumn::Pressure => "pressure",
            WeatherColumn::Timestamp => "timestamp",
            WeatherColumn::DayType => "day_type",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeatherColumn::Temperature => "Temperatura",
            WeatherColumn::WindSpeed => "Prędkość wiatru",
            WeatherColumn::Humidity => "Wilgotność względna",
            WeatherColumn::Rainfall => "Suma opadu",
            WeatherColumn::Pressure => "Ciśnienie",
            WeatherColumn::Timestamp => "timestamp",
            WeatherColumn::DayType => "Typ dnia",
        }
    }
}

/// Statistics reported for a group of delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Mean,
    Median,
    StdDev,
    Q1,
    Q3,
    Count,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Mean,
        Metric::Median,
        Metric::StdDev,
        Metric::Q1,
        Metric::Q3,
        Metric::Count,
    ];

    pub fn canonical_name(self) -> &'static str {
        match self {
            Metric::Mean => "mean",
            Metric::Median => "median",
            Metric::StdDev => "std_dev",
            Metric::Q1 => "q1",
            Metric::Q3 => "q3",
            Metric::Count => "count",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Mean => "Średnia",
            Metric::Median => "Mediana",
            Metric::StdDev => "Odchylenie standardowe",
            Metric::Q1 => "25 centyl",
            Metric::Q3 => "75 centyl",
            Metric::Count => "Ilość",
        }
    }
}

/// Calendar classification of a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Weekday,
    Weekend,
    Holiday,
}

impl DayType {
    pub const ALL: [DayType; 3] = [DayType::Weekday, DayType::Weekend, DayType::Holiday];

    pub fn label(self) -> &'static str {
        match self {
            DayType::Weekday => "Dzień roboczy",
            DayType::Weekend => "Weekend",
            DayType::Holiday => "Święto",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Categorical traffic columns delays can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum TrafficCategory {
    VehicleNo,
    Brigade,
    Route,
    Stop,
    Outside,
    DayType,
}

impl TrafficCategory {
    pub const ALL: [TrafficCategory; 6] = [
        TrafficCategory::VehicleNo,
        TrafficCategory::Brigade,
        TrafficCategory::Route,
        TrafficCategory::Stop,
        TrafficCategory::Outside,
        TrafficCategory::DayType,
    ];

    pub fn column(self) -> TrafficColumn {
        match self {
            TrafficCategory::VehicleNo => TrafficColumn::VehicleNo,
            TrafficCategory::Brigade => TrafficColumn::Brigade,
            TrafficCategory::Route => TrafficColumn::Route,
            TrafficCategory::Stop => TrafficColumn::Stop,
            TrafficCategory::Outside => TrafficColumn::Outside,
            TrafficCategory::DayType => TrafficColumn::DayType,
        }
    }
}
