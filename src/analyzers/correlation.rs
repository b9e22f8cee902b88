//! Joining weather with hourly delay statistics and correlating the result.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::analyzers::types::{DistributionSummary, TimestampDelayStats};
use crate::analyzers::utility::pearson;
use crate::error::{Error, Result};
use crate::normalize::floor_to_hour;
use crate::records::WeatherRecord;
use crate::schema::{Metric, WeatherColumn};

/// A weather observation with the delay statistics of the same hour, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRow {
    pub timestamp: NaiveDateTime,
    pub weather: [Option<f64>; 5],
    pub stats: Option<DistributionSummary>,
}

impl JoinedRow {
    /// Weather measurements followed by every [`Metric`], in
    /// [`CorrelationMatrix::column_names`] order. Metrics are `None` when the
    /// hour had no delay statistics.
    pub fn values(&self) -> Vec<Option<f64>> {
        let mut values = self.weather.to_vec();
        values.extend(
            Metric::ALL
                .iter()
                .map(|&m| self.stats.as_ref().and_then(|s| s.metric(m))),
        );
        values
    }
}

/// Indexes delay statistics by timestamp, rejecting duplicate hours.
pub(crate) fn index_stats(stats: &[TimestampDelayStats]) -> Result<HashMap<NaiveDateTime, &DistributionSummary>> {
    let mut index = HashMap::with_capacity(stats.len());
    for row in stats {
        let key = floor_to_hour(row.timestamp);
        if index.insert(key, &row.summary).is_some() {
            let count = stats
                .iter()
                .filter(|s| floor_to_hour(s.timestamp) == key)
                .count();
            return Err(Error::JoinCardinality {
                key: key.to_string(),
                count,
            });
        }
    }
    Ok(index)
}

/// Left join of weather rows onto per-hour delay statistics.
///
/// Every weather row appears exactly once. Each may match at most one stats
/// row; duplicate stats timestamps fail with [`Error::JoinCardinality`].
pub fn join_weather_with_stats(
    weather: &[WeatherRecord],
    stats: &[TimestampDelayStats],
) -> Result<Vec<JoinedRow>> {
    let index = index_stats(stats)?;

    Ok(weather
        .iter()
        .map(|w| {
            let timestamp = floor_to_hour(w.timestamp);
            JoinedRow {
                timestamp,
                weather: w.measurements(),
                stats: index.get(&timestamp).map(|s| **s),
            }
        })
        .collect())
}

/// Pairwise Pearson coefficients over the numeric columns of the joined
/// weather and delay-statistics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `values[i][j]` correlates `columns[i]` with `columns[j]`; `None` where
    /// undefined.
    pub values: Vec<Vec<Option<f64>>>,
    /// Complete rows the coefficients were computed from.
    pub observations: usize,
}

impl CorrelationMatrix {
    pub fn column_names() -> Vec<String> {
        WeatherColumn::MEASUREMENTS
            .iter()
            .map(|c| c.canonical_name())
            .chain(Metric::ALL.iter().map(|m| m.canonical_name()))
            .map(str::to_string)
            .collect()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Correlates weather with hourly delay statistics.
///
/// Rows with any missing value (including weather hours without delay data)
/// are excluded before any coefficient is computed, so every entry is based
/// on the same set of hours.
pub fn build_correlation_matrix(
    weather: &[WeatherRecord],
    stats: &[TimestampDelayStats],
) -> Result<CorrelationMatrix> {
    let joined = join_weather_with_stats(weather, stats)?;
    let columns = CorrelationMatrix::column_names();
    let width = columns.len();

    let complete: Vec<Vec<f64>> = joined
        .iter()
        .filter_map(|row| row.values().into_iter().collect::<Option<Vec<f64>>>())
        .collect();
    debug!(joined = joined.len(), complete = complete.len(), "Correlation input rows");

    let series: Vec<Vec<f64>> = (0..width)
        .map(|j| complete.iter().map(|row| row[j]).collect())
        .collect();

    let values = (0..width)
        .map(|i| {
            (0..width)
                .map(|j| pearson(&series[i], &series[j]))
                .collect()
        })
        .collect();

    Ok(CorrelationMatrix {
        columns,
        values,
        observations: complete.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::delay_stats_by_timestamp;
    use crate::normalize::parse_timestamp;
    use crate::records::TrafficRecord;
    use approx::assert_abs_diff_eq;

    fn weather(ts: &str, temperature: f64, rainfall: Option<f64>) -> WeatherRecord {
        WeatherRecord {
            timestamp: parse_timestamp(ts).unwrap(),
            temperature: Some(temperature),
            wind_speed: Some(temperature * 0.5 + 1.0),
            humidity: Some(100.0 - temperature),
            rainfall,
            pressure: Some(1000.0 + temperature * temperature),
            day_type: None,
        }
    }

    fn traffic(ts: &str, delay: i64) -> TrafficRecord {
        TrafficRecord {
            vehicle_no: "1".into(),
            brigade: "1".into(),
            route: None,
            stop: None,
            delay_minutes: delay,
            outside_route: false,
            timestamp: parse_timestamp(ts).unwrap(),
            day_type: None,
        }
    }

    #[test]
    fn test_left_join_keeps_unmatched_weather() {
        let w = [weather("2025-01-03 08:00", 1.0, Some(0.0)), weather("2025-01-03 09:00", 2.0, Some(0.0))];
        let stats = delay_stats_by_timestamp(&[traffic("2025-01-03 08:00", 4)]);

        let joined = join_weather_with_stats(&w, &stats).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].stats.unwrap().mean, Some(4.0));
        assert_eq!(joined[1].stats, None);
    }

    #[test]
    fn test_duplicate_stats_timestamps_fail_loudly() {
        let w = [weather("2025-01-03 08:00", 1.0, Some(0.0))];
        let mut stats = delay_stats_by_timestamp(&[traffic("2025-01-03 08:00", 4)]);
        stats.push(stats[0].clone());

        let err = join_weather_with_stats(&w, &stats).unwrap_err();
        assert!(matches!(err, Error::JoinCardinality { count: 2, .. }));
    }

    #[test]
    fn test_correlation_matrix() {
        let hours = ["2025-01-03 08:00", "2025-01-03 09:00", "2025-01-03 10:00", "2025-01-03 11:00"];
        let w: Vec<_> = hours
            .iter()
            .enumerate()
            .map(|(i, h)| weather(h, i as f64, Some((i % 2) as f64)))
            .collect();
        let t: Vec<_> = hours
            .iter()
            .enumerate()
            .flat_map(|(i, h)| [traffic(h, 2 * i as i64), traffic(h, 2 * i as i64 + 2)])
            .collect();
        let stats = delay_stats_by_timestamp(&t);

        let matrix = build_correlation_matrix(&w, &stats).unwrap();
        assert_eq!(matrix.observations, 4);
        assert_eq!(matrix.columns.len(), 11);
        assert_abs_diff_eq!(matrix.get("temperature", "mean").unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(matrix.get("humidity", "mean").unwrap(), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(matrix.get("mean", "mean").unwrap(), 1.0, epsilon = 1e-12);
        // every hour has the same spread and count
        assert_eq!(matrix.get("std_dev", "temperature"), None);
        assert_eq!(matrix.get("count", "mean"), None);
        assert_eq!(matrix.get("temperature", "no_such_column"), None);
    }

    #[test]
    fn test_rows_with_missing_values_are_excluded() {
        let w = [
            weather("2025-01-03 08:00", 1.0, Some(0.0)),
            weather("2025-01-03 09:00", 2.0, None),
            weather("2025-01-03 10:00", 3.0, Some(1.0)),
        ];
        let stats = delay_stats_by_timestamp(&[
            traffic("2025-01-03 08:00", 1),
            traffic("2025-01-03 09:00", 2),
        ]);

        let matrix = build_correlation_matrix(&w, &stats).unwrap();
        assert_eq!(matrix.observations, 1);
        assert_eq!(matrix.get("temperature", "mean"), None);
    }
}
