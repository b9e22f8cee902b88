use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::MergeSummary;
use crate::error::{Error, Result};
use crate::normalize::{normalize_brigade, normalize_delay_marked, normalize_outside, parse_timestamp};
use crate::output::write_csv_atomic;
use crate::parser::{RawDelayRecord, RawRow, read_traffic_snapshot};
use crate::paths::resolve_hourly_paths;
use crate::records::{TrafficRecord, dedup_by_key};
use crate::schema::ColumnSchema;

/// Converts one raw delay row into its canonical form.
pub fn normalize_traffic_record(raw: &RawDelayRecord, schema: &ColumnSchema) -> Result<TrafficRecord> {
    Ok(TrafficRecord {
        vehicle_no: raw.vehicle_no.trim().to_string(),
        brigade: normalize_brigade(&raw.brigade),
        route: raw.route.as_deref().map(|r| r.trim().to_string()),
        stop: raw.stop.as_deref().map(|s| s.trim().to_string()),
        delay_minutes: normalize_delay_marked(&raw.delay, &schema.ahead_of_schedule_marker)?,
        outside_route: normalize_outside(raw.outside.as_deref()),
        timestamp: parse_timestamp(&raw.timestamp)?,
        day_type: None,
    })
}

/// Reads, deduplicates and normalizes the given snapshot files, in order.
///
/// Exact duplicate raw rows are dropped before normalization; rows that
/// become identical after normalization are dropped as well.
pub fn normalize_traffic_rows(paths: &[PathBuf], schema: &ColumnSchema) -> Result<(Vec<TrafficRecord>, usize)> {
    let mut located: Vec<(usize, RawRow<RawDelayRecord>)> = Vec::new();
    for (file_idx, path) in paths.iter().enumerate() {
        let rows = read_traffic_snapshot(path, &schema.traffic)?;
        debug!(path = %path.display(), rows = rows.len(), "Read traffic snapshot");
        located.extend(rows.into_iter().map(|row| (file_idx, row)));
    }

    let raw_rows = located.len();
    let unique = dedup_by_key(located, |(_, row)| row.record.clone());

    let mut records = Vec::with_capacity(unique.len());
    for (file_idx, row) in &unique {
        let record = normalize_traffic_record(&row.record, schema)
            .map_err(|e| e.in_record(&paths[*file_idx], row.line))?;
        records.push(record);
    }

    Ok((dedup_by_key(records, TrafficRecord::clone), raw_rows))
}

/// Merges every hourly snapshot in `[start, end]` under `raw_dir` into one
/// canonical traffic dataset at `output`.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] when no snapshot exists in the range, and a
/// located parse error when any row fails normalization. In both cases
/// `output` is left untouched.
#[instrument(skip(schema))]
pub fn merge_traffic(
    raw_dir: &Path,
    start: NaiveDateTime,
    end: NaiveDateTime,
    output: &Path,
    schema: &ColumnSchema,
) -> Result<MergeSummary> {
    let paths = resolve_hourly_paths(raw_dir, start, end);
    if paths.is_empty() {
        return Err(Error::EmptyInput {
            what: format!("traffic snapshots in {} from {start} to {end}", raw_dir.display()),
        });
    }
    info!(files = paths.len(), "Merging traffic snapshots");

    let (records, raw_rows) = normalize_traffic_rows(&paths, schema)?;
    write_csv_atomic(output, &TrafficRecord::HEADER, &records)?;

    let summary = MergeSummary {
        files_read: paths.len(),
        raw_rows,
        rows_written: records.len(),
        coercion: None,
    };
    info!(
        files = summary.files_read,
        raw_rows = summary.raw_rows,
        rows_written = summary.rows_written,
        "Traffic merge complete"
    );
    Ok(summary)
}
