//! Consolidation of raw snapshots into the canonical datasets.
//!
//! Each merge reads every raw file it is given, drops repeated rows,
//! normalizes fields and writes one dataset atomically. A failure anywhere
//! aborts the run before the destination is touched.

pub mod traffic;
pub mod weather;

pub use traffic::{merge_traffic, normalize_traffic_record, normalize_traffic_rows};
pub use weather::{CoercionReport, merge_weather, normalize_weather_record, normalize_weather_rows};

use serde::Serialize;

/// Outcome of one merge run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeSummary {
    pub files_read: usize,
    pub raw_rows: usize,
    pub rows_written: usize,
    /// Weather only: cells that failed numeric coercion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coercion: Option<CoercionReport>,
}
