//! Runtime configuration read from a TOML file.
//!
//! ```toml
//! [traffic]
//! raw_dir = "data/traffic"
//! start = "2024-12-08T00:00:00"
//! end = "2025-01-02T23:00:00"
//!
//! [weather]
//! merged_path = "data/weather/weather-merged.csv"
//!
//! [schema]
//! ahead_of_schedule_marker = "przed czasem"
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::schema::ColumnSchema;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TRANSIT_DELAYS_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub traffic: TrafficConfig,
    pub weather: WeatherConfig,
    pub schema: ColumnSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Root of the hourly `YYYY/MM/DD/delays-HH.csv` snapshot tree.
    pub raw_dir: PathBuf,
    pub merged_path: PathBuf,
    /// First hour of the merge range, inclusive.
    pub start: NaiveDateTime,
    /// Last hour of the merge range, inclusive.
    pub end: NaiveDateTime,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        let start = NaiveDateTime::parse_from_str("2024-12-08T00:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap_or_default();
        let end = NaiveDateTime::parse_from_str("2025-01-02T23:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap_or_default();
        Self {
            raw_dir: PathBuf::from("data/traffic"),
            merged_path: PathBuf::from("data/traffic/delays-merged.csv"),
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub raw_dir: PathBuf,
    pub merged_path: PathBuf,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/weather"),
            merged_path: PathBuf::from("data/weather/weather-merged.csv"),
        }
    }
}

impl AppConfig {
    /// Loads the file named by `TRANSIT_DELAYS_CONFIG` (default
    /// `config.toml`), falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
        Self::from_path(Path::new(&path))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<AppConfig>(&s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::normalize::parse_timestamp;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::from_path(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.traffic.start, parse_timestamp("2024-12-08 00:00").unwrap());
        assert_eq!(cfg.traffic.end, parse_timestamp("2025-01-02 23:00").unwrap());
        assert_eq!(cfg.schema.traffic.brigade, "Brigade");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[traffic]
raw_dir = "/srv/traffic"
end = "2024-12-31T23:00:00"

[schema.weather]
temperature = "temp"
"#,
        )
        .unwrap();

        let cfg = AppConfig::from_path(&path).unwrap();
        assert_eq!(cfg.traffic.raw_dir, PathBuf::from("/srv/traffic"));
        assert_eq!(cfg.traffic.start, TrafficConfig::default().start);
        assert_eq!(cfg.traffic.end, parse_timestamp("2024-12-31 23:00").unwrap());
        assert_eq!(cfg.weather, WeatherConfig::default());
        assert_eq!(cfg.schema.weather.temperature, "temp");
        assert_eq!(cfg.schema.weather.humidity, "wilgotnosc_wzgledna");
        assert_eq!(cfg.schema.ahead_of_schedule_marker, "przed czasem");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[traffic\nraw_dir = 1").unwrap();
        assert!(matches!(AppConfig::from_path(&path), Err(Error::Config(_))));
    }
}
