//! Embedded SQLite backend
//!
//! The database image lives in memory for the lifetime of the handle.
//! `open` loads it from a file; every successful write serializes the
//! whole image and writes it back atomically. That write is the only
//! durability point: intermediate states never reach disk.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, DatabaseName, OpenFlags};

use super::{DataAccess, Rows, Value};
use crate::error::{Error, Result};

pub struct EmbeddedDb {
    conn: Mutex<Connection>,
    /// None for purely in-memory handles (tests, scratch sessions)
    path: Option<PathBuf>,
}

impl EmbeddedDb {
    /// Open the database file at `path`, loading its image into memory.
    /// A missing file starts an empty database that will be created on
    /// the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut conn = Connection::open_in_memory()?;

        if path.exists() {
            let source = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            let backup = rusqlite::backup::Backup::new(&source, &mut conn)?;
            backup.run_to_completion(64, Duration::ZERO, None)?;
            tracing::debug!(path = %path.display(), "loaded database image");
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    /// In-memory database with no backing file.
    pub fn memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            path: None,
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::backend("database connection poisoned"))
    }

    fn execute_sync(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect();

        let mut result = Vec::new();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                record.push(read_value(row.get_ref(index)?));
            }
            result.push(record);
        }

        Ok(Rows {
            columns,
            rows: result,
        })
    }

    fn run_sync(&self, sql: &str, params: &[Value]) -> Result<()> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(sql)?;
        stmt.execute(rusqlite::params_from_iter(params.iter()))?;
        drop(stmt);
        self.persist(&conn)
    }

    /// Serialize the full in-memory image back to the file.
    fn persist(&self, conn: &Connection) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let image = conn.serialize(DatabaseName::Main)?;
        let bytes: &[u8] = image.as_ref();
        write_atomic(path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "persisted database image");
        Ok(())
    }
}

impl DataAccess for EmbeddedDb {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        self.execute_sync(sql, params)
    }

    async fn run(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.run_sync(sql, params)
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value as SqlValue};
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn read_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        // BLOBs have no block rendering
        ValueRef::Blob(_) => Value::Null,
    }
}

/// Write `data` to a unique temp file in the target directory, then
/// rename over the destination so readers never see a torn image.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::backend(format!("system time error: {e}")))?
        .as_nanos();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::backend("invalid database file path"))?;
    let temp_path = parent.join(format!("{file_name}.{nanos}.tmp"));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_returns_columns_and_rows() {
        let db = EmbeddedDb::memory().unwrap();
        db.run("CREATE TABLE t (a TEXT, b INTEGER)", &[]).await.unwrap();
        db.run(
            "INSERT INTO t (a, b) VALUES (?, ?)",
            &[Value::from("x"), Value::from(7)],
        )
        .await
        .unwrap();

        let rows = db.execute("SELECT a, b FROM t", &[]).await.unwrap();
        assert_eq!(rows.columns, vec!["a", "b"]);
        assert_eq!(rows.first("b"), Some(&Value::Integer(7)));
    }

    #[tokio::test]
    async fn test_write_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");

        {
            let db = EmbeddedDb::open(&path).unwrap();
            db.run("CREATE TABLE t (a TEXT)", &[]).await.unwrap();
            db.run("INSERT INTO t (a) VALUES (?)", &[Value::from("kept")])
                .await
                .unwrap();
        }
        assert!(path.exists());

        let reopened = EmbeddedDb::open(&path).unwrap();
        let rows = reopened.execute("SELECT a FROM t", &[]).await.unwrap();
        assert_eq!(rows.first("a"), Some(&Value::Text("kept".to_string())));
    }

    #[tokio::test]
    async fn test_failed_statement_surfaces_backend_error() {
        let db = EmbeddedDb::memory().unwrap();
        let err = db.execute("SELECT * FROM missing", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Backend { .. }));
    }
}
