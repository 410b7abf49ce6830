//! Storage handle over an embedded SQLite database file.
//!
//! A [`Storage`] owns exactly one [`rusqlite::Connection`]. [`Storage::close`] consumes the
//! handle, so a closed handle cannot be reused or closed twice. A handle that is dropped
//! without `close` still releases its connection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};

use crate::error::{LoadError, LoadResult};
use crate::ingestion::observability::{LoadObserver, LogObserver};
use crate::types::{DataSet, DataType, Field, Schema, Value};

const ROWID_ALIASES: [&str; 3] = ["rowid", "_rowid_", "oid"];

/// Open connection to a database file.
pub struct Storage {
    conn: Connection,
    path: PathBuf,
    observer: Arc<dyn LoadObserver>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").field("path", &self.path).finish()
    }
}

impl Storage {
    /// Open (or create) the database at `path`, reporting status through a [`LogObserver`].
    pub fn open(path: impl AsRef<Path>) -> LoadResult<Self> {
        Self::open_with_observer(path, Arc::new(LogObserver))
    }

    /// Open (or create) the database at `path`, reporting status to `observer`.
    ///
    /// The file header is checked right away, so a file that is not a SQLite database fails
    /// here with [`LoadError::StorageOpen`] rather than on the first write.
    pub fn open_with_observer(
        path: impl AsRef<Path>,
        observer: Arc<dyn LoadObserver>,
    ) -> LoadResult<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source: rusqlite::Error| LoadError::StorageOpen {
            path: path.clone(),
            source,
        };

        let conn = Connection::open(&path).map_err(open_err)?;
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get::<_, i64>(0))
            .map_err(open_err)?;

        observer.on_connected(&path);
        Ok(Self {
            conn,
            path,
            observer,
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Observer this handle reports to.
    pub fn observer(&self) -> &Arc<dyn LoadObserver> {
        &self.observer
    }

    /// Release the connection.
    pub fn close(self) -> LoadResult<()> {
        let Storage {
            conn,
            path,
            observer,
        } = self;
        conn.close().map_err(|(_, e)| LoadError::Sqlite(e))?;
        observer.on_disconnected(&path);
        Ok(())
    }

    /// Write `data` as table `table`, replacing any existing table of that name.
    ///
    /// Drop, create and inserts run in one transaction, so a failed write leaves the previous
    /// table (if any) untouched. Returns the number of rows written.
    pub fn write_table(&mut self, table: &str, data: &DataSet) -> LoadResult<usize> {
        let write_err = |source: rusqlite::Error| LoadError::Write {
            table: table.to_owned(),
            source,
        };

        let tx = self.conn.transaction().map_err(write_err)?;
        let ident = quote_ident(table);
        tx.execute(&format!("DROP TABLE IF EXISTS {ident}"), [])
            .map_err(write_err)?;
        tx.execute(&create_table_sql(&ident, &data.schema), [])
            .map_err(write_err)?;

        {
            let placeholders = vec!["?"; data.column_count()].join(", ");
            let mut stmt = tx
                .prepare(&format!("INSERT INTO {ident} VALUES ({placeholders})"))
                .map_err(write_err)?;
            for row in &data.rows {
                stmt.execute(params_from_iter(row.iter())).map_err(write_err)?;
            }
        }

        tx.commit().map_err(write_err)?;
        log::debug!(
            "wrote {} rows to table '{table}' in {}",
            data.row_count(),
            self.path.display()
        );
        Ok(data.row_count())
    }

    /// Read table `table` back in insertion order.
    ///
    /// Column types come from the declared column types of the table.
    pub fn read_table(&self, table: &str) -> LoadResult<DataSet> {
        let ident = quote_ident(table);

        let mut info = self.conn.prepare(&format!("PRAGMA table_info({ident})"))?;
        let fields = info
            .query_map([], |r| {
                let name: String = r.get(1)?;
                let decl: String = r.get(2)?;
                Ok(Field::new(name, DataType::from_declared(&decl)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if fields.is_empty() {
            return Err(LoadError::NoSuchTable(table.to_owned()));
        }

        // A user column named `rowid` hides the implicit one; fall back to its other aliases.
        // With all three shadowed, a plain table scan still yields rowid order.
        let order_by = ROWID_ALIASES
            .into_iter()
            .find(|alias| !fields.iter().any(|f| f.name.eq_ignore_ascii_case(alias)))
            .map(|alias| format!(" ORDER BY {alias}"))
            .unwrap_or_default();

        let width = fields.len();
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {ident}{order_by}"))?;
        let rows = stmt
            .query_map([], |r| {
                (0..width)
                    .map(|i| r.get_ref(i).map(value_from_ref))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DataSet::new(Schema::new(fields), rows))
    }

    /// Names of all user tables, sorted.
    pub fn table_names(&self) -> LoadResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Returns `true` if a table named `table` exists. Names compare case-insensitively, as
    /// SQLite resolves them.
    pub fn has_table(&self, table: &str) -> LoadResult<bool> {
        let found = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [table],
            |r| r.get::<_, i64>(0),
        )?;
        Ok(found > 0)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Int64(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Float64(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Utf8(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn value_from_ref(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(b) | ValueRef::Blob(b) => Value::Utf8(String::from_utf8_lossy(b).into_owned()),
    }
}

/// Double-quote an SQL identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(ident: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields
        .iter()
        .map(|f| format!("{} {}", quote_ident(&f.name), f.data_type.sql_type()))
        .collect();
    format!("CREATE TABLE {ident} ({})", columns.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> DataSet {
        DataSet::new(
            Schema::new(vec![
                Field::new("id", DataType::Int64),
                Field::new("name", DataType::Utf8),
                Field::new("score", DataType::Float64),
            ]),
            vec![
                vec![Value::Int64(1), Value::from("Alice"), Value::Float64(1.5)],
                vec![Value::Int64(2), Value::from("Bob"), Value::Null],
            ],
        )
    }

    fn memory_storage() -> Storage {
        Storage::open(":memory:").unwrap()
    }

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn create_table_sql_declares_types() {
        let sql = create_table_sql("\"t\"", &people().schema);
        assert_eq!(
            sql,
            "CREATE TABLE \"t\" (\"id\" INTEGER, \"name\" TEXT, \"score\" REAL)"
        );
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut storage = memory_storage();
        let written = storage.write_table("people", &people()).unwrap();
        assert_eq!(written, 2);
        assert_eq!(storage.read_table("people").unwrap(), people());
    }

    #[test]
    fn write_replaces_existing_table() {
        let mut storage = memory_storage();
        storage.write_table("t", &people()).unwrap();

        let smaller = DataSet::new(
            Schema::new(vec![Field::new("only", DataType::Utf8)]),
            vec![vec![Value::from("x")]],
        );
        storage.write_table("t", &smaller).unwrap();

        assert_eq!(storage.read_table("t").unwrap(), smaller);
        assert_eq!(storage.table_names().unwrap(), vec!["t".to_string()]);
    }

    #[test]
    fn identifiers_with_spaces_and_quotes_are_accepted() {
        let mut storage = memory_storage();
        let ds = DataSet::new(
            Schema::new(vec![Field::new("first \"name\"", DataType::Utf8)]),
            vec![vec![Value::from("Ada")]],
        );
        storage.write_table("my table", &ds).unwrap();
        assert!(storage.has_table("my table").unwrap());
        assert_eq!(storage.read_table("my table").unwrap(), ds);
    }

    #[test]
    fn duplicate_columns_are_a_write_error() {
        let mut storage = memory_storage();
        let ds = DataSet::new(
            Schema::new(vec![
                Field::new("ID", DataType::Int64),
                Field::new("id", DataType::Int64),
            ]),
            vec![],
        );
        let err = storage.write_table("t", &ds).unwrap_err();
        assert!(matches!(err, LoadError::Write { ref table, .. } if table == "t"));
        assert!(!storage.has_table("t").unwrap());
    }

    #[test]
    fn rowid_named_column_keeps_insertion_order() {
        let mut storage = memory_storage();
        let ds = DataSet::new(
            Schema::new(vec![
                Field::new("rowid", DataType::Int64),
                Field::new("name", DataType::Utf8),
            ]),
            vec![
                vec![Value::Int64(2), Value::from("first")],
                vec![Value::Int64(1), Value::from("second")],
            ],
        );
        storage.write_table("t", &ds).unwrap();
        assert_eq!(storage.read_table("t").unwrap(), ds);
    }

    #[test]
    fn all_rowid_aliases_shadowed_still_reads_in_order() {
        let mut storage = memory_storage();
        let ds = DataSet::new(
            Schema::new(vec![
                Field::new("ROWID", DataType::Int64),
                Field::new("_rowid_", DataType::Int64),
                Field::new("oid", DataType::Int64),
            ]),
            vec![
                vec![Value::Int64(3), Value::Int64(3), Value::Int64(3)],
                vec![Value::Int64(1), Value::Int64(1), Value::Int64(1)],
            ],
        );
        storage.write_table("t", &ds).unwrap();
        assert_eq!(storage.read_table("t").unwrap(), ds);
    }

    #[test]
    fn has_table_ignores_case() {
        let mut storage = memory_storage();
        storage.write_table("t1", &people()).unwrap();
        assert!(storage.has_table("T1").unwrap());
        assert!(!storage.has_table("t2").unwrap());
    }

    #[test]
    fn reading_unknown_table_fails() {
        let storage = memory_storage();
        assert!(matches!(
            storage.read_table("nope").unwrap_err(),
            LoadError::NoSuchTable(ref t) if t == "nope"
        ));
    }

    #[test]
    fn close_consumes_handle() {
        let storage = memory_storage();
        storage.close().unwrap();
    }
}
