//! Widget data store
//!
//! The read/write path shared by every widget kind: fetch the current
//! value for a `(key, date)` row, and upsert a new one. Tables are not
//! owned by this layer: a `uuid` surrogate key and an `updatedAt`
//! timestamp column may or may not exist, so their presence is probed
//! once per table and cached for the session. Rows are never deleted
//! here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use super::WidgetAttrs;
use crate::db::{DataAccess, Value};
use crate::error::{Error, Result};
use crate::schema;
use crate::validation::quote_identifier;

/// What the target table optionally provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableCapabilities {
    pub has_surrogate_key: bool,
    pub has_updated_at: bool,
}

pub struct WidgetStore<D> {
    db: Arc<D>,
    capabilities: Mutex<HashMap<String, TableCapabilities>>,
}

impl<D: DataAccess> WidgetStore<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self {
            db,
            capabilities: Mutex::new(HashMap::new()),
        }
    }

    /// Column capabilities for `table`, probed via table metadata on
    /// first use and cached for the session.
    pub async fn capabilities(&self, table: &str) -> Result<TableCapabilities> {
        if let Some(cached) = self.cached_capabilities(table) {
            return Ok(cached);
        }

        let columns = schema::table_columns(self.db.as_ref(), table).await?;
        let caps = TableCapabilities {
            has_surrogate_key: columns.iter().any(|c| c.name == "uuid"),
            has_updated_at: columns.iter().any(|c| c.name == "updatedAt"),
        };
        self.capabilities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_string(), caps);
        Ok(caps)
    }

    fn cached_capabilities(&self, table: &str) -> Option<TableCapabilities> {
        self.capabilities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .copied()
    }

    /// Current value for the widget's `(key, date)` row, or None when no
    /// row exists yet.
    pub async fn fetch_value(&self, attrs: &WidgetAttrs, date: &str) -> Result<Option<Value>> {
        let sql = format!(
            "SELECT {} AS value FROM {} WHERE {} = ? AND {} = ?",
            quote_identifier(&attrs.value_column)?,
            quote_identifier(&attrs.table)?,
            quote_identifier(&attrs.key_column)?,
            quote_identifier(&attrs.date_column)?,
        );
        let rows = self
            .db
            .execute(&sql, &[Value::from(attrs.key.as_str()), Value::from(date)])
            .await?;
        Ok(rows.first("value").cloned())
    }

    /// Write `new_value` for the widget's `(key, date)` row: update in
    /// place when the row is reachable by surrogate key, otherwise
    /// insert-or-update keyed on the natural key. Idempotent: repeating
    /// the call with the same value leaves exactly one row, unchanged.
    pub async fn upsert_value(
        &self,
        attrs: &WidgetAttrs,
        date: &str,
        new_value: Value,
    ) -> Result<()> {
        let caps = self.capabilities(&attrs.table).await?;

        let surrogate = if caps.has_surrogate_key {
            self.probe_surrogate_key(attrs, date).await?
        } else {
            None
        };

        match surrogate {
            Some(uuid) => self.update_by_surrogate(attrs, caps, new_value, uuid).await,
            None => self.upsert_by_natural_key(attrs, caps, date, new_value).await,
        }
    }

    /// Look up the row's `uuid`. A "no such column" failure here means
    /// the capability probe was wrong about this table (dropped column,
    /// remote schema drift) and is demoted to "no surrogate key"; any
    /// other failure propagates.
    async fn probe_surrogate_key(
        &self,
        attrs: &WidgetAttrs,
        date: &str,
    ) -> Result<Option<String>> {
        let sql = format!(
            "SELECT uuid FROM {} WHERE {} = ? AND {} = ?",
            quote_identifier(&attrs.table)?,
            quote_identifier(&attrs.key_column)?,
            quote_identifier(&attrs.date_column)?,
        );
        match self
            .db
            .execute(&sql, &[Value::from(attrs.key.as_str()), Value::from(date)])
            .await
        {
            Ok(rows) => Ok(rows
                .first("uuid")
                .and_then(Value::as_str)
                .map(str::to_string)),
            Err(err) if err.is_missing_column("uuid") => {
                tracing::warn!(
                    table = attrs.table,
                    "capability probe reported a uuid column that does not exist; using natural-key upsert"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn update_by_surrogate(
        &self,
        attrs: &WidgetAttrs,
        caps: TableCapabilities,
        new_value: Value,
        uuid: String,
    ) -> Result<()> {
        let value_column = quote_identifier(&attrs.value_column)?;
        let table = quote_identifier(&attrs.table)?;

        if caps.has_updated_at {
            let sql = format!(
                "UPDATE {table} SET {value_column} = ?, \"updatedAt\" = ? WHERE uuid = ?"
            );
            self.db
                .run(
                    &sql,
                    &[new_value, Value::from(now_timestamp()), Value::from(uuid)],
                )
                .await
        } else {
            let sql = format!("UPDATE {table} SET {value_column} = ? WHERE uuid = ?");
            self.db.run(&sql, &[new_value, Value::from(uuid)]).await
        }
    }

    /// `INSERT ... ON CONFLICT(key, date) DO UPDATE`. Requires the
    /// target table to carry a UNIQUE index on those columns, a
    /// deployment precondition this layer cannot create. A conflict
    /// target mismatch is re-raised naming exactly that index.
    async fn upsert_by_natural_key(
        &self,
        attrs: &WidgetAttrs,
        caps: TableCapabilities,
        date: &str,
        new_value: Value,
    ) -> Result<()> {
        let table = quote_identifier(&attrs.table)?;
        let key_column = quote_identifier(&attrs.key_column)?;
        let date_column = quote_identifier(&attrs.date_column)?;
        let value_column = quote_identifier(&attrs.value_column)?;

        let (sql, params) = if caps.has_updated_at {
            (
                format!(
                    "INSERT INTO {table} ({key_column}, {date_column}, {value_column}, \"updatedAt\") VALUES (?, ?, ?, ?) \
                     ON CONFLICT({key_column}, {date_column}) DO UPDATE SET {value_column} = excluded.{value_column}, \
                     \"updatedAt\" = excluded.\"updatedAt\""
                ),
                vec![
                    Value::from(attrs.key.as_str()),
                    Value::from(date),
                    new_value,
                    Value::from(now_timestamp()),
                ],
            )
        } else {
            (
                format!(
                    "INSERT INTO {table} ({key_column}, {date_column}, {value_column}) VALUES (?, ?, ?) \
                     ON CONFLICT({key_column}, {date_column}) DO UPDATE SET {value_column} = excluded.{value_column}"
                ),
                vec![
                    Value::from(attrs.key.as_str()),
                    Value::from(date),
                    new_value,
                ],
            )
        };

        self.db.run(&sql, &params).await.map_err(|err| {
            if err.is_conflict_target_mismatch() {
                Error::MissingUniqueIndex {
                    table: attrs.table.clone(),
                    key_column: attrs.key_column.clone(),
                    date_column: attrs.date_column.clone(),
                }
            } else {
                err
            }
        })
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}
