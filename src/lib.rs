//! `csv-sqlite-loader` is a one-shot batch loader: it parses delimited text files into an
//! in-memory [`types::DataSet`] and materializes each one as a table in an embedded SQLite
//! database, replacing any existing table of the same name.
//!
//! The primary entrypoint is [`loader::run_with_config`], which opens the database named in a
//! [`config::LoaderConfig`], loads every mapped file in order and closes the database again.
//!
//! ## Loading rules
//!
//! - The first line of each file is the header and defines the column names.
//! - Column types are inferred from the data: all-integer columns become `INTEGER`, other
//!   numeric columns `REAL`, everything else `TEXT`.
//! - Empty fields, common null markers (`NA`, `null`, ...) and missing trailing fields become
//!   SQL `NULL`.
//! - A row with more fields than the header aborts the run at that file.
//! - A mapped file that does not exist is reported and skipped; it is not an error.
//! - Each table is dropped and recreated in its own transaction; there is no append mode.
//!
//! ## Quick example
//!
//! ```no_run
//! use csv_sqlite_loader::config::{LoaderConfig, TableMapping};
//! use csv_sqlite_loader::loader::{run_with_config, LoadOptions};
//!
//! # fn main() -> Result<(), csv_sqlite_loader::LoadError> {
//! let config = LoaderConfig::new(
//!     "warehouse.db",
//!     vec![
//!         TableMapping::new("customers", "data/customers.csv"),
//!         TableMapping::new("orders", "data/orders.csv"),
//!     ],
//! );
//! let summary = run_with_config(&config, &LoadOptions::default())?;
//! println!("tables={} skipped={}", summary.loaded.len(), summary.skipped.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Lower-level use
//!
//! ```rust
//! use csv_sqlite_loader::ingestion::{parse_csv_from_bytes, CsvOptions};
//! use csv_sqlite_loader::storage::Storage;
//! use csv_sqlite_loader::types::Value;
//!
//! let data = parse_csv_from_bytes("id,name\n1,Alice\n2,Bob\n".as_bytes(), &CsvOptions::default()).unwrap();
//! let mut storage = Storage::open(":memory:").unwrap();
//! storage.write_table("t1", &data).unwrap();
//!
//! let back = storage.read_table("t1").unwrap();
//! assert_eq!(back.get(1, "name"), Some(&Value::Utf8("Bob".to_string())));
//! storage.close().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`config`]: database path + ordered table mapping, JSON decoding, glob expansion
//! - [`ingestion`]: delimited-text parsing and the observer hook for status reporting
//! - [`storage`]: the SQLite storage handle
//! - [`loader`]: per-file and per-run loading
//! - [`types`]: schema + in-memory dataset types
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod ingestion;
pub mod loader;
pub mod storage;
pub mod types;

pub use error::{ErrorKind, LoadError, LoadResult};
