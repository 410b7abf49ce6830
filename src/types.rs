//! Core data model types.
//!
//! A parsed source file becomes a [`DataSet`]: a header-derived [`Schema`] (a list of typed
//! [`Field`]s) plus row-major [`Value`] storage in file order.

/// Logical data type for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// Declared SQLite column type used when creating a table.
    pub fn sql_type(self) -> &'static str {
        match self {
            DataType::Int64 => "INTEGER",
            DataType::Float64 => "REAL",
            DataType::Utf8 => "TEXT",
        }
    }

    /// Map a declared SQLite column type back to a logical type.
    ///
    /// Follows SQLite's column affinity rules; anything that is neither integer nor real
    /// affinity reads back as [`DataType::Utf8`].
    pub fn from_declared(decl: &str) -> Self {
        let decl = decl.to_ascii_uppercase();
        if decl.contains("INT") {
            DataType::Int64
        } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
            DataType::Float64
        } else {
            DataType::Utf8
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the columns of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// In-memory tabular batch.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. Every row
/// has exactly `schema.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    /// Look up a cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate rows as `(column name, value)` pairs in schema order.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> {
        self.rows
            .iter()
            .map(|row| self.schema.field_names().zip(row.iter()).collect())
    }
}
