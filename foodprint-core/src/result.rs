//! Tabular query results.
//!
//! The engine returns positional text cells. The first row names the columns;
//! every later row becomes a [`Row`] keyed by those names. Cells stay text
//! until a caller asks for a typed value.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::engine::RawRow;
use crate::error::QueryError;

/// An ordered column name -> text value record.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Option<String>>,
}

impl Row {
    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw text of a column. None when the column is absent or NULL.
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Text of a column that must be present and non-NULL.
    pub fn require(&self, column: &str) -> Result<&str, QueryError> {
        self.get(column)
            .ok_or_else(|| QueryError::MalformedResult(format!("Missing column: {}", column)))
    }

    pub fn parse_i64(&self, column: &str) -> Result<i64, QueryError> {
        let raw = self.require(column)?;
        raw.trim().parse().map_err(|_| {
            QueryError::MalformedResult(format!("Column {} is not an integer: {}", column, raw))
        })
    }

    pub fn parse_f64(&self, column: &str) -> Result<f64, QueryError> {
        let raw = self.require(column)?;
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                QueryError::MalformedResult(format!("Column {} is not a number: {}", column, raw))
            })
    }

    /// Drop a column, keeping the order of the rest.
    pub fn without(self, column: &str) -> Row {
        let Some(index) = self.columns.iter().position(|c| c == column) else {
            return self;
        };
        let columns: Arc<[String]> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, c)| c.clone())
            .collect();
        let mut values = self.values;
        if index < values.len() {
            values.remove(index);
        }
        Row { columns, values }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.values.iter()) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// All rows of one query, header removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Map raw engine rows into records. The first row is the header.
    ///
    /// Short rows are padded with NULLs; cells beyond the header are dropped.
    pub fn from_raw(raw: Vec<RawRow>) -> Self {
        let mut iter = raw.into_iter();
        let Some(header) = iter.next() else {
            return Self::default();
        };

        let columns: Vec<String> = header
            .into_iter()
            .enumerate()
            .map(|(i, name)| name.unwrap_or_else(|| format!("_col{}", i)))
            .collect();
        let shared: Arc<[String]> = columns.clone().into();

        let rows = iter
            .map(|mut values| {
                values.resize(shared.len(), None);
                Row {
                    columns: shared.clone(),
                    values,
                }
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Boolean text as stored in flag columns and accepted in query strings:
/// true/false in any case, or 1/0.
pub fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
