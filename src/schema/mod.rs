//! Schema validation
//!
//! Runs strictly before query compilation: fetches live column metadata
//! for the block's table and rejects configurations referencing unknown
//! columns. All unknown names are reported together with the full
//! available-column list, so the host can show complete "did you mean"
//! context in one round trip.

use blockql::{ChartBlock, QueryBlock};

use crate::db::{DataAccess, Value};
use crate::error::{Error, Result};
use crate::validation::quote_identifier;

/// One column of a table, as reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

/// Fetch column metadata for `table` through the data-access layer.
///
/// PRAGMA cannot bind the table name as a parameter, so it goes through
/// identifier quoting like every other name.
pub async fn table_columns<D: DataAccess>(db: &D, table: &str) -> Result<Vec<ColumnInfo>> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table)?);
    let rows = db.execute(&sql, &[]).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for index in 0..rows.len() {
        let name = match rows.value(index, "name") {
            Some(Value::Text(name)) => name.clone(),
            _ => continue,
        };
        let column_type = rows
            .value(index, "type")
            .map(Value::display)
            .unwrap_or_default();
        let not_null = rows
            .value(index, "notnull")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            != 0;
        let primary_key = rows
            .value(index, "pk")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            != 0;
        columns.push(ColumnInfo {
            name,
            column_type,
            not_null,
            primary_key,
        });
    }
    Ok(columns)
}

/// Validate a row-query block against the live schema.
pub async fn validate_query<D: DataAccess>(db: &D, block: &QueryBlock) -> Result<()> {
    let mut referenced: Vec<&str> = Vec::new();
    if let Some(columns) = &block.columns {
        referenced.extend(columns.iter().map(String::as_str));
    }
    if let Some(date_column) = &block.date_column {
        referenced.push(date_column);
    }
    referenced.extend(block.filters.iter().map(|f| f.column.as_str()));
    if let Some(order_by) = &block.order_by {
        referenced.push(order_by);
    }

    check_columns(db, &block.table, &referenced).await
}

/// Validate a chart block against the live schema. The date column only
/// participates when the block configures a complete date range.
pub async fn validate_chart<D: DataAccess>(db: &D, block: &ChartBlock) -> Result<()> {
    let mut referenced: Vec<&str> = Vec::new();
    match block {
        ChartBlock::Pie(pie) => {
            referenced.push(&pie.category_column);
            referenced.push(&pie.value_column);
        }
        ChartBlock::TimeSeries(ts) => {
            referenced.push(&ts.x_column);
            referenced.extend(ts.y_columns.iter().map(String::as_str));
            if let Some(category) = &ts.category_column {
                referenced.push(category);
            }
        }
    }
    if let Some((date_column, _, _)) = block.date_range() {
        referenced.push(date_column);
    }

    check_columns(db, block.table(), &referenced).await
}

async fn check_columns<D: DataAccess>(db: &D, table: &str, referenced: &[&str]) -> Result<()> {
    let available: Vec<String> = table_columns(db, table)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();

    if available.is_empty() {
        return Err(Error::SchemaValidation {
            message: format!("table '{table}' does not exist or has no columns"),
            available_columns: Vec::new(),
        });
    }

    let mut unknown: Vec<&str> = referenced
        .iter()
        .copied()
        .filter(|name| !available.iter().any(|col| col == name))
        .collect();
    unknown.dedup();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(Error::SchemaValidation {
            message: format!(
                "table '{table}' has no column(s): {}",
                unknown.join(", ")
            ),
            available_columns: available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::EmbeddedDb;

    async fn habits_db() -> EmbeddedDb {
        let db = EmbeddedDb::memory().unwrap();
        db.run(
            "CREATE TABLE Habits (habit TEXT, date TEXT, count INTEGER)",
            &[],
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_table_columns_reports_metadata() {
        let db = habits_db().await;
        let columns = table_columns(&db, "Habits").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "habit");
        assert_eq!(columns[2].column_type, "INTEGER");
    }

    #[tokio::test]
    async fn test_missing_table_named_in_error() {
        let db = habits_db().await;
        let block = blockql::parse_query_block("table: Nope").unwrap();
        let err = validate_query(&db, &block).await.unwrap_err();
        match err {
            Error::SchemaValidation { message, available_columns } => {
                assert!(message.contains("Nope"));
                assert!(available_columns.is_empty());
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_unknown_columns_reported_together() {
        let db = habits_db().await;
        let block = blockql::parse_query_block(
            "table: Habits\ncolumns: habit, typo1\norderBy: typo2",
        )
        .unwrap();
        let err = validate_query(&db, &block).await.unwrap_err();
        match err {
            Error::SchemaValidation { message, available_columns } => {
                assert!(message.contains("typo1"));
                assert!(message.contains("typo2"));
                assert_eq!(available_columns, vec!["habit", "date", "count"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chart_date_column_checked_only_with_range() {
        let db = habits_db().await;
        // dateColumn alone (no range) is not referenced, so a bad name passes
        let chart = blockql::parse_chart_block(
            "table: Habits\nchartType: pie\ncategoryColumn: habit\nvalueColumn: count\ndateColumn: nope",
        )
        .unwrap();
        assert!(validate_chart(&db, &chart).await.is_ok());

        let chart = blockql::parse_chart_block(
            "table: Habits\nchartType: pie\ncategoryColumn: habit\nvalueColumn: count\ndateColumn: nope\nstartDate: 2024-01-01\nendDate: 2024-01-31",
        )
        .unwrap();
        assert!(validate_chart(&db, &chart).await.is_err());
    }
}
