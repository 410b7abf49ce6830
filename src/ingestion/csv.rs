//! Delimited-text parsing with per-column type inference.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Markers treated as null in addition to the empty field.
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
    "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "1.#IND", "1.#QNAN",
];

/// Options controlling how delimited text is split and typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Quote byte.
    pub quote: u8,
    /// Exact cell contents that parse as [`Value::Null`].
    pub na_values: HashSet<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CsvOptions {
    /// Default options with a different delimiter.
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote);
        builder
    }
}

/// Parse a delimited file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - The first non-blank line is the header and defines the column names.
/// - Rows shorter than the header are padded with nulls.
/// - Rows longer than the header fail the whole file with [`LoadError::RaggedRow`].
/// - Column types are inferred from the data: integer, then float, then string.
pub fn parse_csv_from_path(path: impl AsRef<Path>, options: &CsvOptions) -> LoadResult<DataSet> {
    let mut rdr = options.reader_builder().from_path(path)?;
    parse_csv_from_reader(&mut rdr, options)
}

/// Parse delimited text from any byte source using the given options.
pub fn parse_csv_from_bytes<R: Read>(input: R, options: &CsvOptions) -> LoadResult<DataSet> {
    let mut rdr = options.reader_builder().from_reader(input);
    parse_csv_from_reader(&mut rdr, options)
}

/// Parse delimited text from an existing CSV reader.
///
/// The reader must be configured with `has_headers(true)` and `flexible(true)`; otherwise
/// short rows are rejected by the reader itself before they can be padded.
pub fn parse_csv_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    options: &CsvOptions,
) -> LoadResult<DataSet> {
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(LoadError::EmptyInput);
    }
    let names = normalize_headers(headers.iter());
    let width = names.len();

    let mut cells: Vec<Vec<Option<String>>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() > width {
            return Err(LoadError::RaggedRow {
                line: record.position().map_or(0, |p| p.line()),
                expected: width,
                found: record.len(),
            });
        }

        let mut row = Vec::with_capacity(width);
        for idx in 0..width {
            let cell = record
                .get(idx)
                .filter(|raw| !options.na_values.contains(*raw) && !raw.is_empty())
                .map(str::to_owned);
            row.push(cell);
        }
        cells.push(row);
    }

    let types: Vec<DataType> = (0..width)
        .map(|col| infer_column_type(cells.iter().filter_map(|row| row[col].as_deref())))
        .collect();

    let rows: Vec<Vec<Value>> = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(types.iter())
                .map(|(cell, data_type)| convert_cell(cell, *data_type))
                .collect()
        })
        .collect();

    let schema = Schema::new(
        names
            .into_iter()
            .zip(types)
            .map(|(name, data_type)| Field::new(name, data_type))
            .collect(),
    );
    Ok(DataSet::new(schema, rows))
}

/// Clean up header names: strip a UTF-8 BOM, name blank columns `Unnamed: {idx}`, and
/// disambiguate duplicates as `name.1`, `name.2`, ...
fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut dup_counts: HashMap<String, usize> = HashMap::new();

    for (idx, name) in raw.enumerate() {
        let name = if idx == 0 {
            name.trim_start_matches('\u{feff}')
        } else {
            name
        };
        let base = if name.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name.to_owned()
        };

        let mut candidate = base.clone();
        while seen.contains(&candidate) {
            let n = dup_counts.entry(base.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{base}.{n}");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> DataType {
    let mut all_int = true;
    let mut all_float = true;
    for raw in values {
        let trimmed = raw.trim();
        if all_int && trimmed.parse::<i64>().is_err() {
            all_int = false;
        }
        if trimmed.parse::<f64>().is_err() {
            all_float = false;
            break;
        }
    }

    // An all-null column stays numeric: it is a float column of nulls.
    if all_int && all_float {
        DataType::Int64
    } else if all_float {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

fn convert_cell(cell: Option<String>, data_type: DataType) -> Value {
    let Some(raw) = cell else {
        return Value::Null;
    };
    match data_type {
        DataType::Int64 => raw.trim().parse().map_or(Value::Null, Value::Int64),
        DataType::Float64 => raw.trim().parse().map_or(Value::Null, Value::Float64),
        DataType::Utf8 => Value::Utf8(raw),
    }
}
