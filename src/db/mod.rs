//! Data access
//!
//! Everything above this layer sees one narrow contract: `execute` for
//! statements that return rows, `run` for statements that do not, both
//! with positional bind parameters. Two backends implement it: an
//! embedded in-process engine whose database image lives in memory and is
//! written back to a file after every successful write, and a remote HTTP
//! service speaking `{sql, params}` JSON.

mod embedded;
mod remote;

pub use embedded::EmbeddedDb;
pub use remote::RemoteDb;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A scalar database value. Mirrors the SQLite storage classes used by
/// block output (BLOBs have no rendering and are read back as NULL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Host-facing display form; NULL renders as an empty cell.
    pub fn display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// An ordered result set with its column names
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Value at `(row, column)`, if both exist
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Value of `column` in the first row (the common single-row lookup)
    pub fn first(&self, column: &str) -> Option<&Value> {
        self.value(0, column)
    }

    /// Rebuild from remote JSON row objects (column-name-keyed).
    pub(crate) fn from_json_objects(objects: Vec<serde_json::Map<String, serde_json::Value>>) -> Self {
        let columns: Vec<String> = objects
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        let rows = objects
            .into_iter()
            .map(|mut row| {
                columns
                    .iter()
                    .map(|c| row.remove(c).map(json_to_value).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Rows { columns, rows }
    }
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(b as i64),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Text(s),
        other => Value::Text(other.to_string()),
    }
}

/// The execute/run contract both engines expose.
///
/// `run` is durable on return: for the embedded engine the full database
/// image has been written back to disk, for the remote engine the service
/// has acknowledged the statement. Neither backend retries.
pub trait DataAccess {
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Rows>> + Send;

    fn run(&self, sql: &str, params: &[Value]) -> impl Future<Output = Result<()>> + Send;
}

/// Runtime-selected backend
pub enum Backend {
    Embedded(EmbeddedDb),
    Remote(RemoteDb),
}

impl DataAccess for Backend {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        match self {
            Backend::Embedded(db) => db.execute(sql, params).await,
            Backend::Remote(db) => db.execute(sql, params).await,
        }
    }

    async fn run(&self, sql: &str, params: &[Value]) -> Result<()> {
        match self {
            Backend::Embedded(db) => db.run(sql, params).await,
            Backend::Remote(db) => db.run(sql, params).await,
        }
    }
}
