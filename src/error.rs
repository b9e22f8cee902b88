//! Error types shared by the merge and analysis pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A raw field could not be coerced where coercion is mandatory.
    #[error("cannot parse {field} value {value:?}")]
    Parse { field: &'static str, value: String },

    /// A failure tied to a specific line of a raw input file.
    #[error("{}:{line}: {source}", .path.display())]
    InRecord {
        path: PathBuf,
        line: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("{}: missing required column {column:?}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// No input files were found for a merge that needs at least one.
    #[error("no input files found for {what}")]
    EmptyInput { what: String },

    /// A join expected unique keys on one side and found duplicates.
    #[error("join key {key} occurs {count} times where at most one row was expected")]
    JoinCardinality { key: String, count: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("cannot read directory entry: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn parse(field: &'static str, value: impl Into<String>) -> Self {
        Error::Parse {
            field,
            value: value.into(),
        }
    }

    /// Attaches the file and line a failure came from.
    pub(crate) fn in_record(self, path: impl Into<PathBuf>, line: u64) -> Self {
        Error::InRecord {
            path: path.into(),
            line,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_record_message_names_file_and_field() {
        let err = Error::parse("Delay", "abc").in_record("data/traffic/2025/01/03/delays-08.csv", 7);
        let msg = err.to_string();
        assert!(msg.contains("delays-08.csv:7"));
        assert!(msg.contains("Delay"));
        assert!(msg.contains("\"abc\""));
    }
}
