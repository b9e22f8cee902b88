use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::MergeSummary;
use crate::error::Result;
use crate::normalize::{coerce_numeric, weather_timestamp};
use crate::output::write_csv_atomic;
use crate::parser::{RawRow, RawWeatherRecord, read_weather_snapshot};
use crate::paths::discover_csv_files;
use crate::records::{WeatherRecord, dedup_by_key};
use crate::schema::{ColumnSchema, WeatherColumn};

/// Count of non-empty measurement cells that were not numeric, per column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoercionReport {
    pub failures: BTreeMap<String, usize>,
    /// Rows dropped because the measurement date or hour was missing.
    pub rows_without_timestamp: usize,
}

impl CoercionReport {
    fn record_failure(&mut self, column: WeatherColumn) {
        *self
            .failures
            .entry(column.canonical_name().to_string())
            .or_default() += 1;
    }

    pub fn total_failures(&self) -> usize {
        self.failures.values().sum()
    }
}

/// Converts one raw weather row into its canonical form.
///
/// Returns `Ok(None)` for rows without a measurement date or hour. Cells that
/// do not parse as numbers become missing values and are counted in `report`.
pub fn normalize_weather_record(
    raw: &RawWeatherRecord,
    report: &mut CoercionReport,
) -> Result<Option<WeatherRecord>> {
    let (Some(date), Some(hour)) = (raw.date.as_deref(), raw.hour.as_deref()) else {
        report.rows_without_timestamp += 1;
        return Ok(None);
    };

    let timestamp = weather_timestamp(date, hour)?;

    let mut values = [None; 5];
    for ((value, cell), column) in values
        .iter_mut()
        .zip(&raw.measurements)
        .zip(WeatherColumn::MEASUREMENTS)
    {
        if let Some(cell) = cell {
            *value = coerce_numeric(cell);
            if value.is_none() {
                report.record_failure(column);
            }
        }
    }
    let [temperature, wind_speed, humidity, rainfall, pressure] = values;

    Ok(Some(WeatherRecord {
        timestamp,
        temperature,
        wind_speed,
        humidity,
        rainfall,
        pressure,
        day_type: None,
    }))
}

/// Reads and normalizes the given weather files, dropping duplicate rows.
pub fn normalize_weather_rows(
    paths: &[PathBuf],
    schema: &ColumnSchema,
) -> Result<(Vec<WeatherRecord>, usize, CoercionReport)> {
    let mut report = CoercionReport::default();
    let mut records = Vec::new();
    let mut raw_rows = 0;

    for path in paths {
        let rows: Vec<RawRow<RawWeatherRecord>> = read_weather_snapshot(path, &schema.weather)?;
        debug!(path = %path.display(), rows = rows.len(), "Read weather snapshot");
        raw_rows += rows.len();

        for row in rows {
            let record = normalize_weather_record(&row.record, &mut report)
                .map_err(|e| e.in_record(path, row.line))?;
            records.extend(record);
        }
    }

    Ok((dedup_by_key(records, WeatherRecord::dedup_key), raw_rows, report))
}

/// Merges every `*.csv` file below `raw_dir` into one canonical weather
/// dataset at `output`.
///
/// Unlike the traffic merge an empty tree is not an error: it produces a
/// dataset with a header and no rows. `output` itself is skipped if it lives
/// under `raw_dir`.
#[instrument(skip(schema))]
pub fn merge_weather(raw_dir: &Path, output: &Path, schema: &ColumnSchema) -> Result<MergeSummary> {
    let output_abs = std::path::absolute(output).unwrap_or_else(|_| output.to_path_buf());
    let paths: Vec<PathBuf> = discover_csv_files(raw_dir)?
        .into_iter()
        .filter(|p| std::path::absolute(p).map_or(true, |abs| abs != output_abs))
        .collect();

    if paths.is_empty() {
        warn!(raw_dir = %raw_dir.display(), "No weather snapshots found, writing empty dataset");
    } else {
        info!(files = paths.len(), "Merging weather snapshots");
    }

    let (records, raw_rows, report) = normalize_weather_rows(&paths, schema)?;

    if report.total_failures() > 0 {
        warn!(failures = ?report.failures, "Non-numeric weather cells coerced to missing");
    }
    if report.rows_without_timestamp > 0 {
        warn!(rows = report.rows_without_timestamp, "Weather rows without date or hour dropped");
    }

    write_csv_atomic(output, &WeatherRecord::HEADER, &records)?;

    let summary = MergeSummary {
        files_read: paths.len(),
        raw_rows,
        rows_written: records.len(),
        coercion: Some(report),
    };
    info!(
        files = summary.files_read,
        raw_rows = summary.raw_rows,
        rows_written = summary.rows_written,
        "Weather merge complete"
    );
    Ok(summary)
}
