use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use csv_sqlite_loader::config::{expand_glob, LoaderConfig, TableMapping};
use csv_sqlite_loader::ingestion::{
    CompositeObserver, CsvOptions, FileObserver, LoadObserver, LogObserver,
};
use csv_sqlite_loader::loader::{run_with_observer, LoadOptions};
use csv_sqlite_loader::{LoadError, LoadResult};

/// Load delimited text files into SQLite tables, replacing existing tables of the same name.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "csv-sqlite-loader")]
struct Cli {
    /// Destination database file (created if absent); overrides `db_path` from --config
    #[arg(long)]
    db: Option<PathBuf>,

    /// Table mapping as NAME=PATH; repeat for several tables, loaded in the given order
    #[arg(short, long = "table", value_name = "NAME=PATH")]
    tables: Vec<TableMapping>,

    /// Load every file matching a glob pattern into a table named after the file stem
    #[arg(short, long = "glob", value_name = "PATTERN")]
    globs: Vec<String>,

    /// JSON configuration file with `db_path` and `tables`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Field delimiter (a single ASCII character)
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Also append status events to this file
    #[arg(long, value_name = "FILE")]
    event_log: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> LoadResult<()> {
    let config = build_config(&cli)?;
    let options = LoadOptions {
        csv: CsvOptions::with_delimiter(delimiter_byte(cli.delimiter)?),
    };

    let observer: Arc<dyn LoadObserver> = match &cli.event_log {
        Some(path) => {
            let observers: Vec<Arc<dyn LoadObserver>> =
                vec![Arc::new(LogObserver), Arc::new(FileObserver::new(path))];
            Arc::new(CompositeObserver::new(observers))
        }
        None => Arc::new(LogObserver),
    };

    let summary = run_with_observer(&config, &options, observer)?;
    log::info!(
        "Done: {} tables loaded ({} rows), {} skipped",
        summary.loaded.len(),
        summary.total_rows(),
        summary.skipped.len()
    );
    Ok(())
}

fn build_config(cli: &Cli) -> LoadResult<LoaderConfig> {
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_json_path(path)?,
        None => {
            let db = cli
                .db
                .clone()
                .ok_or_else(|| LoadError::Config {
                    message: "either --db or --config is required".to_string(),
                })?;
            LoaderConfig::new(db, Vec::new())
        }
    };

    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    config.tables.extend(cli.tables.iter().cloned());
    for pattern in &cli.globs {
        config.tables.extend(expand_glob(pattern)?);
    }
    Ok(config)
}

fn delimiter_byte(c: char) -> LoadResult<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(LoadError::Config {
            message: format!("delimiter must be a single ASCII character, got '{c}'"),
        })
    }
}
