use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A raw catalog record, exactly as it came off the wire
pub type Record = Map<String, Value>;

/// One value in a shaped row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Null,
    Integer(i64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Cell::Null => SqlValue::Null,
            Cell::Integer(n) => SqlValue::Integer(*n),
            Cell::Text(s) => return Ok(ToSqlOutput::from(s.as_str())),
            // Stored as ISO-8601 text, which is how SQLite's date functions expect it
            Cell::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Integer(n) => serializer.serialize_i64(*n),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        }
    }
}

/// A shaped row - one value per declared column, in column order
pub type Row = Vec<Cell>;

/// A shaped table ready for loading
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Destination table name, e.g. "people", "people_films"
    pub name: String,

    /// Column names, in the order every row stores its cells
    pub columns: Vec<String>,

    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Table {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// All values of one column, in row order
    pub fn column(&self, column: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Render a row as a JSON object keyed by column name
    pub fn row_object(&self, row: &Row) -> Map<String, Value> {
        self.columns
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| {
                let value = serde_json::to_value(cell).unwrap_or(Value::Null);
                (column.clone(), value)
            })
            .collect()
    }
}

/// Every shaped table of one run, in load order (parents before children)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapedCatalog {
    pub tables: Vec<Table>,
}

impl ShapedCatalog {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}
