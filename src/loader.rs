//! Drives a load run: one storage handle, an ordered table mapping, one table per file.
//!
//! Per run the handle moves `OPEN → LOADING(0..n) → CLOSED`. A missing source file is reported
//! and skipped. The first parse or write failure aborts the run; [`run_with_config`] still
//! releases the handle on that path before returning the error.

use std::path::Path;
use std::sync::Arc;

use crate::config::{LoaderConfig, TableMapping};
use crate::error::{LoadError, LoadResult};
use crate::ingestion::csv::{parse_csv_from_path, CsvOptions};
use crate::ingestion::observability::{LoadObserver, LoadStats, LogObserver};
use crate::storage::Storage;

/// Options applied to every file of a run.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Delimited-text parsing options.
    pub csv: CsvOptions,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tables written, in mapping order.
    pub loaded: Vec<LoadStats>,
    /// Mapping entries whose source file did not exist.
    pub skipped: Vec<TableMapping>,
}

impl RunSummary {
    /// Total rows written across all tables.
    pub fn total_rows(&self) -> usize {
        self.loaded.iter().map(|s| s.rows).sum()
    }
}

/// Parse `file_path` and write it as `table_name`, replacing any existing table.
///
/// Errors are reported to the storage observer and then returned unchanged.
pub fn load_file(
    storage: &mut Storage,
    file_path: impl AsRef<Path>,
    table_name: &str,
    options: &LoadOptions,
) -> LoadResult<LoadStats> {
    let path = file_path.as_ref();
    if table_name.is_empty() {
        return Err(LoadError::config("table name must not be empty"));
    }

    let result = parse_csv_from_path(path, &options.csv)
        .and_then(|data| Ok((storage.write_table(table_name, &data)?, data.column_count())));

    match result {
        Ok((rows, columns)) => {
            let stats = LoadStats {
                table: table_name.to_owned(),
                path: path.to_path_buf(),
                rows,
                columns,
            };
            storage.observer().on_loaded(&stats);
            Ok(stats)
        }
        Err(e) => {
            storage.observer().on_failure(table_name, path, &e);
            Err(e)
        }
    }
}

/// Load every mapping entry in order.
///
/// Entries whose file does not exist are reported and skipped. The first failing entry
/// aborts the run: tables before it stay written, entries after it are not attempted.
pub fn run(
    storage: &mut Storage,
    mapping: &[TableMapping],
    options: &LoadOptions,
) -> LoadResult<RunSummary> {
    let mut summary = RunSummary::default();
    for entry in mapping {
        if !entry.path.exists() {
            storage.observer().on_missing_file(&entry.table, &entry.path);
            summary.skipped.push(entry.clone());
            continue;
        }
        let stats = load_file(storage, &entry.path, &entry.table, options)?;
        summary.loaded.push(stats);
    }
    Ok(summary)
}

/// Validate `config`, open its database, run the mapping and close the database.
///
/// The handle is closed on every exit path, including a failed load. Status lines go to the
/// `log` facade.
pub fn run_with_config(config: &LoaderConfig, options: &LoadOptions) -> LoadResult<RunSummary> {
    run_with_observer(config, options, Arc::new(LogObserver))
}

/// Like [`run_with_config`] but reports to `observer`.
pub fn run_with_observer(
    config: &LoaderConfig,
    options: &LoadOptions,
    observer: Arc<dyn LoadObserver>,
) -> LoadResult<RunSummary> {
    config.validate()?;
    let mut storage = Storage::open_with_observer(&config.db_path, observer)?;

    match run(&mut storage, &config.tables, options) {
        Ok(summary) => {
            storage.close()?;
            Ok(summary)
        }
        Err(e) => {
            if let Err(close_err) = storage.close() {
                log::warn!("closing database after failed run also failed: {close_err}");
            }
            Err(e)
        }
    }
}
