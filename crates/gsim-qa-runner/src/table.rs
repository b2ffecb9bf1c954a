//! Uniform metrics-table model and loaders
//!
//! A metrics artifact may be a flat delimited file or a table inside a
//! SQLite container; both load into the same ordered-columns,
//! ordered-rows table so the comparator treats them uniformly.

use crate::error::{Error, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Name of the metrics table inside a SQLite artifact
pub const DEFAULT_METRICS_TABLE: &str = "mgpusim_metrics";

/// One cell of a metrics table
///
/// Equality is exact: integers and text compare by value, reals by bit
/// pattern. The workload is expected to be deterministic bit-for-bit,
/// so no tolerance exists anywhere.
#[derive(Debug, Clone, Serialize)]
pub enum CellValue {
    /// SQL NULL
    Null,
    /// Integer cell
    Integer(i64),
    /// Floating-point cell
    Real(f64),
    /// Text cell (all CSV cells load as text)
    Text(String),
    /// Raw blob cell
    Blob(Vec<u8>),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(t) => write!(f, "{t}"),
            Self::Blob(b) => write!(f, "blob({} bytes)", b.len()),
        }
    }
}

impl From<SqlValue> for CellValue {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Null,
            SqlValue::Integer(i) => Self::Integer(i),
            SqlValue::Real(r) => Self::Real(r),
            SqlValue::Text(t) => Self::Text(t),
            SqlValue::Blob(b) => Self::Blob(b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

/// An ordered table of named columns and positional rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsTable {
    /// Column names, in schema order
    pub columns: Vec<String>,
    /// Rows, in artifact order
    pub rows: Vec<Vec<CellValue>>,
}

impl MetricsTable {
    /// Create an empty table with the given column schema
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowArity`] if the row does not match the column
    /// count.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::RowArity {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Load an artifact, dispatching on its file extension
    ///
    /// SQLite containers are read from [`DEFAULT_METRICS_TABLE`]; use
    /// [`Self::load_with_table`] for another table name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedArtifact`] for unknown extensions,
    /// or the loader's parse error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_table(path, DEFAULT_METRICS_TABLE)
    }

    /// Load an artifact with an explicit SQLite table name
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_table(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Self::from_csv_path(path),
            Some("sqlite3" | "sqlite" | "db") => Self::from_sqlite_path(path, table),
            _ => Err(Error::UnsupportedArtifact {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Load a delimited table: first record is the header, every cell
    /// is text
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;

        let columns = reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut table = Self::new(columns);

        for record in reader.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| CellValue::Text(cell.to_string()))
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Load the named table from a SQLite container
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not a readable database or the
    /// table cannot be queried.
    pub fn from_sqlite_path(path: &Path, table: &str) -> Result<Self> {
        let connection =
            Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut statement = connection.prepare(&format!("SELECT * FROM \"{table}\""))?;

        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let column_count = columns.len();
        let mut result = Self::new(columns);

        let mut rows = statement.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for index in 0..column_count {
                let value: SqlValue = row.get(index)?;
                cells.push(CellValue::from(value));
            }
            result.push_row(cells)?;
        }
        Ok(result)
    }
}
