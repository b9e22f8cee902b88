//! Persistence of canonical datasets and rendering of analysis results.
//!
//! Datasets are written atomically: rows go to a temporary file next to the
//! destination, which then replaces the final path in one rename.

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::Result;

/// Writes `rows` under `header` to `path`, replacing any previous file only
/// once every row has been written.
///
/// The header is written even when `rows` is empty.
pub fn write_csv_atomic<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    debug!(path = %path.display(), tmp = %tmp.path().display(), rows = rows.len(), "Writing CSV");

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(tmp);

    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    let mut tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), rows = rows.len(), "Dataset written");
    Ok(())
}

/// Renders a result as pretty-printed JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
