pub mod columns;
pub mod delimited;

use anyhow::{anyhow, bail, Result};
use duckdb::types::{ToSql, ToSqlOutput, Value};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

pub use columns::{project, rename};
pub use delimited::parse_delimited;

/// A single typed field of a [`Table`].
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            _ => None,
        }
    }
}

// Floats compare by bit pattern so cells can key a HashMap when grouping.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Int(a), Cell::Int(b)) => a == b,
            (Cell::Float(a), Cell::Float(b)) => a.to_bits() == b.to_bits(),
            (Cell::Text(a), Cell::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Null => {}
            Cell::Int(v) => v.hash(state),
            Cell::Float(v) => v.to_bits().hash(state),
            Cell::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            Cell::Null => Value::Null,
            Cell::Int(v) => Value::BigInt(*v),
            Cell::Float(v) => Value::Double(*v),
            Cell::Text(s) => Value::Text(s.clone()),
        }))
    }
}

/// Column-labelled rows, the in-memory form of one CSV export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    /// One `Vec<Cell>` per row, always `headers.len()` wide.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like [`Table::column_index`] but a missing column is an error.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow!("column `{}` not found in {:?}", name, self.headers))
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.width() {
            bail!(
                "row has {} fields but table has {} columns",
                row.len(),
                self.width()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    /// Iterate the values of one column.
    pub fn column<'a>(&'a self, name: &str) -> Result<impl Iterator<Item = &'a Cell> + 'a> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Set column `name` to `values`, appending it if it does not exist yet.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<()> {
        if values.len() != self.height() {
            bail!(
                "column `{}` has {} values but table has {} rows",
                name,
                values.len(),
                self.height()
            );
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    /// Convert column `name` to integers in place.
    ///
    /// Floats are truncated toward zero and numeric text is parsed. A null,
    /// non-numeric or non-finite value fails the whole column.
    pub fn coerce_int(&mut self, name: &str) -> Result<()> {
        let idx = self.require(name)?;
        for (row_no, row) in self.rows.iter_mut().enumerate() {
            let coerced = coerce_cell_to_int(&row[idx]).ok_or_else(|| {
                anyhow!(
                    "cannot convert {} in column `{}` at row {} to an integer",
                    row[idx],
                    name,
                    row_no
                )
            })?;
            row[idx] = Cell::Int(coerced);
        }
        Ok(())
    }
}

fn coerce_cell_to_int(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(v) => Some(*v),
        Cell::Float(v) if v.is_finite() => Some(v.trunc() as i64),
        Cell::Text(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}
