//! Locating raw snapshot files on disk.

use chrono::{Duration, NaiveDateTime};
use glob::{Pattern, glob};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::normalize::floor_to_hour;

/// Path of the raw traffic snapshot for the hour containing `ts`:
/// `<base>/<YYYY>/<MM>/<DD>/delays-<HH>.csv`.
pub fn hourly_path(base_dir: &Path, ts: NaiveDateTime) -> PathBuf {
    base_dir.join(ts.format("%Y/%m/%d/delays-%H.csv").to_string())
}

/// One candidate path per hour in `[start, end]`, whether or not it exists.
pub fn hourly_candidates(base_dir: &Path, start: NaiveDateTime, end: NaiveDateTime) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = floor_to_hour(start);

    while current <= end {
        paths.push(hourly_path(base_dir, current));
        current += Duration::hours(1);
    }

    paths
}

/// Existing hourly snapshot files in `[start, end]`, oldest first.
///
/// An inverted range or a range with no files yields an empty list.
pub fn resolve_hourly_paths(base_dir: &Path, start: NaiveDateTime, end: NaiveDateTime) -> Vec<PathBuf> {
    let candidates = hourly_candidates(base_dir, start, end);
    let total = candidates.len();

    let existing: Vec<PathBuf> = candidates.into_iter().filter(|p| p.exists()).collect();
    debug!(base_dir = %base_dir.display(), candidates = total, existing = existing.len(), "Resolved hourly paths");

    existing
}

/// Every `*.csv` file below `root` (`<root>/**/*.csv`), in sorted path order.
///
/// A missing root is treated as an empty tree.
pub fn discover_csv_files(root: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.csv", Pattern::escape(&root.to_string_lossy()));

    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    debug!(root = %root.display(), files = files.len(), "Discovered CSV files");
    Ok(files)
}
