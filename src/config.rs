//! Run configuration: the destination database plus an ordered table mapping.
//!
//! A configuration can be built in code, decoded from JSON, or assembled by the CLI from
//! `NAME=PATH` arguments and glob patterns.
//!
//! ```json
//! {
//!   "db_path": "warehouse.db",
//!   "tables": [
//!     { "table": "customers", "path": "data/customers.csv" },
//!     { "table": "orders", "path": "data/orders.csv" }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};

/// One `(table name, source file)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMapping {
    /// Destination table name.
    pub table: String,
    /// Source delimited-text file.
    pub path: PathBuf,
}

impl TableMapping {
    /// Create a new mapping entry.
    pub fn new(table: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
            path: path.into(),
        }
    }
}

impl FromStr for TableMapping {
    type Err = LoadError;

    /// Parse `NAME=PATH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (table, path) = s
            .split_once('=')
            .ok_or_else(|| LoadError::config(format!("expected NAME=PATH, got '{s}'")))?;
        let table = table.trim();
        if table.is_empty() || path.is_empty() {
            return Err(LoadError::config(format!("expected NAME=PATH, got '{s}'")));
        }
        Ok(Self::new(table, path))
    }
}

/// Everything a load run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Destination database file; created if absent.
    pub db_path: PathBuf,
    /// Ordered mapping of table name to source file.
    #[serde(default)]
    pub tables: Vec<TableMapping>,
}

impl LoaderConfig {
    /// Create a configuration from a database path and mapping.
    pub fn new(db_path: impl Into<PathBuf>, tables: Vec<TableMapping>) -> Self {
        Self {
            db_path: db_path.into(),
            tables,
        }
    }

    /// Decode a configuration from a JSON string.
    pub fn from_json_str(input: &str) -> LoadResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Read and decode a JSON configuration file.
    pub fn from_json_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let raw = fs::read_to_string(path.as_ref()).map_err(|e| {
            LoadError::config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Check the run invariants: a database path is set, and table names are non-empty and
    /// unique (a repeated name would silently overwrite the earlier entry's table).
    ///
    /// Uniqueness ignores ASCII case, since SQLite resolves `T1` and `t1` to the same table.
    pub fn validate(&self) -> LoadResult<()> {
        if self.db_path.as_os_str().is_empty() {
            return Err(LoadError::config("db_path must not be empty"));
        }

        let mut seen = HashSet::new();
        for (idx, mapping) in self.tables.iter().enumerate() {
            if mapping.table.is_empty() {
                return Err(LoadError::config(format!("table name at position {idx} is empty")));
            }
            if !seen.insert(mapping.table.to_ascii_lowercase()) {
                return Err(LoadError::config(format!(
                    "duplicate table name '{}'",
                    mapping.table
                )));
            }
        }
        Ok(())
    }
}

/// Build mappings for every file matching `pattern`, naming each table after the file stem.
///
/// Matches are returned sorted by path so runs are deterministic.
pub fn expand_glob(pattern: &str) -> LoadResult<Vec<TableMapping>> {
    let paths = glob::glob(pattern)
        .map_err(|e| LoadError::config(format!("invalid glob pattern '{pattern}': {e}")))?;

    let mut out = Vec::new();
    for entry in paths {
        let path = entry.map_err(std::io::Error::from)?;
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        out.push(TableMapping::new(stem, path.clone()));
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}
