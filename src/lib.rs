//! Notelite - embedded database widgets for note-taking apps
//!
//! Declarative blocks written in notes compile to parameterized SQL and
//! render as lists, tables and charts; interactive widgets (counters,
//! switches, text fields) read and write rows keyed by a natural key and
//! a date, and stay synchronized with a shared date/period selection.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Notelite                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────────┐   ┌───────────────────┐   │
//! │  │  blockql   │   │   Schema     │   │  Shared Selection │   │
//! │  │  Parser    │──▶│   Validator  │   │  State (@date)    │   │
//! │  └────────────┘   └──────┬───────┘   └─────────┬─────────┘   │
//! │                          ▼                     │             │
//! │  ┌──────────────────────────────────┐          ▼             │
//! │  │          Query Compiler          │   ┌───────────────┐    │
//! │  │  (row queries, pie, line/bar)    │   │    Widgets    │    │
//! │  └──────────────┬───────────────────┘   │ counter/switch│    │
//! │                 ▼                       │ /text + store │    │
//! │  ┌──────────────────────────────────┐   └───────┬───────┘    │
//! │  │     Data Access (execute/run)    │◀──────────┘            │
//! │  │   embedded file  |  remote HTTP  │                        │
//! │  └──────────────────────────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod charts;
pub mod db;
pub mod error;
pub mod query;
pub mod render;
pub mod schema;
pub mod state;
pub mod validation;
pub mod widgets;

pub use error::{Error, Result};

use std::collections::HashMap;
use std::sync::Arc;

use charts::ChartData;
use db::{DataAccess, Rows, Value};
use render::QueryOutput;
use schema::ColumnInfo;
use state::SelectionState;
use widgets::{CounterWidget, SwitchWidget, TextWidget, WidgetStore};

/// The plugin engine: one backend, one selection state, one widget
/// store. The host creates it at activation and drops it at
/// deactivation; nothing persists across sessions except the database
/// file itself.
pub struct Engine<D> {
    db: Arc<D>,
    state: Arc<SelectionState>,
    store: Arc<WidgetStore<D>>,
}

impl<D: DataAccess> Engine<D> {
    /// Engine seeded with today's date and day navigation.
    pub fn new(db: D) -> Self {
        Self::with_state(db, SelectionState::today())
    }

    pub fn with_state(db: D, state: SelectionState) -> Self {
        let db = Arc::new(db);
        Self {
            store: Arc::new(WidgetStore::new(db.clone())),
            db,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &Arc<SelectionState> {
        &self.state
    }

    pub fn store(&self) -> &Arc<WidgetStore<D>> {
        &self.store
    }

    /// Process a row-query block (placeholders → parse → validate →
    /// compile → execute).
    pub async fn process_query_block(&self, source: &str) -> Result<QueryOutput> {
        query::process_query_block(self.db.as_ref(), &self.state, source).await
    }

    /// Process a chart block into renderable chart data.
    pub async fn process_chart_block(&self, source: &str) -> Result<ChartData> {
        query::process_chart_block(self.db.as_ref(), &self.state, source).await
    }

    /// Build a counter widget from host attributes.
    pub fn counter(&self, attrs: &HashMap<String, String>) -> CounterWidget<D> {
        CounterWidget::new(self.store.clone(), self.state.clone(), attrs)
    }

    /// Build a boolean switch widget from host attributes.
    pub fn switch(&self, attrs: &HashMap<String, String>) -> SwitchWidget<D> {
        SwitchWidget::new(self.store.clone(), self.state.clone(), attrs)
    }

    /// Build a text field widget from host attributes.
    pub fn text(&self, attrs: &HashMap<String, String>) -> TextWidget<D> {
        TextWidget::new(self.store.clone(), self.state.clone(), attrs)
    }

    /// Column metadata for a table (the `inspect` command).
    pub async fn inspect_table(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        schema::table_columns(self.db.as_ref(), table).await
    }

    /// User table names, alphabetically.
    pub async fn tables(&self) -> Result<Vec<String>> {
        let rows = self
            .db
            .execute(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
            )
            .await?;
        Ok(rows
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    /// Run a raw read statement.
    pub async fn execute_sql(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        self.db.execute(sql, params).await
    }

    /// Run a raw write statement; durable on return.
    pub async fn run_sql(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.db.run(sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::EmbeddedDb;

    #[tokio::test]
    async fn test_engine_lists_tables() {
        let engine = Engine::new(EmbeddedDb::memory().unwrap());
        engine
            .run_sql("CREATE TABLE Zebra (a TEXT)", &[])
            .await
            .unwrap();
        engine
            .run_sql("CREATE TABLE Apple (a TEXT)", &[])
            .await
            .unwrap();

        assert_eq!(engine.tables().await.unwrap(), vec!["Apple", "Zebra"]);
    }

    #[tokio::test]
    async fn test_engine_inspects_columns() {
        let engine = Engine::new(EmbeddedDb::memory().unwrap());
        engine
            .run_sql(
                "CREATE TABLE Habits (id INTEGER PRIMARY KEY, habit TEXT NOT NULL)",
                &[],
            )
            .await
            .unwrap();

        let columns = engine.inspect_table("Habits").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert!(columns[0].primary_key);
        assert!(columns[1].not_null);
    }
}
