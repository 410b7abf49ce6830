use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error type returned by parsing, storage and loader functions.
///
/// A missing source file is deliberately *not* represented here: the loader treats it as an
/// expected condition, reports it to the observer and moves on.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The database file could not be opened, created or recognized as SQLite.
    #[error("cannot open database '{}': {source}", .path.display())]
    StorageOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Underlying I/O error while reading a source file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited-text reader rejected the input (bad quoting, invalid UTF-8, ...).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The input contained no header line.
    #[error("no header line found in input")]
    EmptyInput,

    /// A data row carried more fields than the header declares.
    #[error("line {line}: expected at most {expected} fields, saw {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The storage layer rejected a write (disk full, constraint, duplicate column, ...).
    #[error("write to table '{table}' failed: {source}")]
    Write {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A table that was expected to exist is missing.
    #[error("no such table: {0}")]
    NoSuchTable(String),

    /// Any other SQLite failure (reads, close).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The configuration file could not be decoded.
    #[error("config decode error: {0}")]
    ConfigDecode(#[from] serde_json::Error),

    /// The configuration is well-formed but violates a loader invariant.
    #[error("invalid config: {message}")]
    Config { message: String },
}

/// Coarse classification of a [`LoadError`], matching the loader's failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Cannot open or create the database; the run never starts.
    StorageOpen,
    /// Malformed or unreadable source file.
    Parse,
    /// Storage write failure.
    Write,
    /// Invalid mapping or configuration.
    Config,
}

impl LoadError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::StorageOpen { .. } => ErrorKind::StorageOpen,
            LoadError::Io(_)
            | LoadError::Csv(_)
            | LoadError::EmptyInput
            | LoadError::RaggedRow { .. } => ErrorKind::Parse,
            LoadError::Write { .. } | LoadError::NoSuchTable(_) | LoadError::Sqlite(_) => ErrorKind::Write,
            LoadError::ConfigDecode(_) | LoadError::Config { .. } => ErrorKind::Config,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        LoadError::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, LoadError};

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(LoadError::EmptyInput.kind(), ErrorKind::Parse);
        assert_eq!(
            LoadError::RaggedRow {
                line: 3,
                expected: 2,
                found: 3
            }
            .kind(),
            ErrorKind::Parse
        );
        assert_eq!(LoadError::config("dup").kind(), ErrorKind::Config);
        assert_eq!(
            LoadError::Write {
                table: "t".to_string(),
                source: rusqlite::Error::QueryReturnedNoRows,
            }
            .kind(),
            ErrorKind::Write
        );
    }

    #[test]
    fn ragged_row_message_names_line_and_counts() {
        let msg = LoadError::RaggedRow {
            line: 4,
            expected: 2,
            found: 5,
        }
        .to_string();
        assert_eq!(msg, "line 4: expected at most 2 fields, saw 5");
    }
}
