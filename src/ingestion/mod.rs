//! Source-file ingestion.
//!
//! - [`csv`]: parse delimited text into an in-memory [`crate::types::DataSet`], inferring a
//!   type per column
//! - [`observability`]: the [`LoadObserver`] hook through which every status line of a load
//!   run is reported

pub mod csv;
pub mod observability;

pub use self::csv::{parse_csv_from_bytes, parse_csv_from_path, CsvOptions, DEFAULT_NA_VALUES};
pub use observability::{CompositeObserver, FileObserver, LoadObserver, LoadStats, LogObserver};
