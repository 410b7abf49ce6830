use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LoadError;

/// Stats reported when one source file has been written to its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStats {
    /// Destination table name.
    pub table: String,
    /// Source file path.
    pub path: PathBuf,
    /// Number of rows written.
    pub rows: usize,
    /// Number of columns written.
    pub columns: usize,
}

/// Observer interface for the lifecycle of a load run.
///
/// Every status line the loader produces goes through one of these callbacks, so implementors
/// can log, record or forward them. All methods default to no-ops.
pub trait LoadObserver: Send + Sync {
    /// Called once the database connection is open.
    fn on_connected(&self, _db_path: &Path) {}

    /// Called after a file has been parsed and written.
    fn on_loaded(&self, _stats: &LoadStats) {}

    /// Called when a mapped source file does not exist. The run continues.
    fn on_missing_file(&self, _table: &str, _path: &Path) {}

    /// Called when loading a file fails. The error is still returned to the caller.
    fn on_failure(&self, _table: &str, _path: &Path, _error: &LoadError) {}

    /// Called when the database connection is released.
    fn on_disconnected(&self, _db_path: &Path) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_connected(&self, db_path: &Path) {
        for o in &self.observers {
            o.on_connected(db_path);
        }
    }

    fn on_loaded(&self, stats: &LoadStats) {
        for o in &self.observers {
            o.on_loaded(stats);
        }
    }

    fn on_missing_file(&self, table: &str, path: &Path) {
        for o in &self.observers {
            o.on_missing_file(table, path);
        }
    }

    fn on_failure(&self, table: &str, path: &Path, error: &LoadError) {
        for o in &self.observers {
            o.on_failure(table, path, error);
        }
    }

    fn on_disconnected(&self, db_path: &Path) {
        for o in &self.observers {
            o.on_disconnected(db_path);
        }
    }
}

/// Emits human-readable status lines through the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl LoadObserver for LogObserver {
    fn on_connected(&self, db_path: &Path) {
        log::info!("Connected to database {}", db_path.display());
    }

    fn on_loaded(&self, stats: &LoadStats) {
        log::info!(
            "Loaded {} rows ({} columns) from {} into table '{}'",
            stats.rows,
            stats.columns,
            stats.path.display(),
            stats.table
        );
    }

    fn on_missing_file(&self, table: &str, path: &Path) {
        log::warn!("File {} does not exist, skipping table '{table}'", path.display());
    }

    fn on_failure(&self, table: &str, path: &Path, error: &LoadError) {
        log::error!(
            "Failed to load {} into table '{table}' ({:?}): {error}",
            path.display(),
            error.kind()
        );
    }

    fn on_disconnected(&self, db_path: &Path) {
        log::info!("Closed connection to database {}", db_path.display());
    }
}

/// Appends load events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl LoadObserver for FileObserver {
    fn on_connected(&self, db_path: &Path) {
        self.append_line(&format!("{} connected db={}", unix_ts(), db_path.display()));
    }

    fn on_loaded(&self, stats: &LoadStats) {
        self.append_line(&format!(
            "{} loaded table={} path={} rows={} columns={}",
            unix_ts(),
            stats.table,
            stats.path.display(),
            stats.rows,
            stats.columns
        ));
    }

    fn on_missing_file(&self, table: &str, path: &Path) {
        self.append_line(&format!(
            "{} missing table={table} path={}",
            unix_ts(),
            path.display()
        ));
    }

    fn on_failure(&self, table: &str, path: &Path, error: &LoadError) {
        self.append_line(&format!(
            "{} fail kind={:?} table={table} path={} err={error}",
            unix_ts(),
            error.kind(),
            path.display()
        ));
    }

    fn on_disconnected(&self, db_path: &Path) {
        self.append_line(&format!("{} disconnected db={}", unix_ts(), db_path.display()));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_observer_appends_one_line_per_event() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let log_path = std::env::temp_dir().join(format!("csv-sqlite-loader-events-{nanos}.log"));
        let observers: Vec<Arc<dyn LoadObserver>> = vec![
            Arc::new(LogObserver),
            Arc::new(FileObserver::new(&log_path)),
        ];
        let obs = CompositeObserver::new(observers);

        obs.on_connected(Path::new("out.db"));
        obs.on_loaded(&LoadStats {
            table: "t1".to_string(),
            path: PathBuf::from("a.csv"),
            rows: 2,
            columns: 2,
        });
        obs.on_missing_file("t2", Path::new("b.csv"));
        obs.on_failure("t3", Path::new("c.csv"), &LoadError::EmptyInput);
        obs.on_disconnected(Path::new("out.db"));

        let text = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("connected db=out.db"));
        assert!(lines[1].ends_with("loaded table=t1 path=a.csv rows=2 columns=2"));
        assert!(lines[2].ends_with("missing table=t2 path=b.csv"));
        assert!(lines[3].contains("fail kind=Parse table=t3"));
        assert!(lines[4].ends_with("disconnected db=out.db"));
        let _ = std::fs::remove_file(&log_path);
    }
}
