//! Block execution pipeline
//!
//! The full path a block takes: placeholder substitution → parse →
//! schema validation → compilation → execution → output assembly.
//! Configuration and schema failures are terminal: they surface to the
//! caller instead of any partial output.

use crate::charts::{build_chart_data, ChartData};
use crate::db::DataAccess;
use crate::error::Result;
use crate::render::QueryOutput;
use crate::schema;
use crate::state::SelectionState;

use super::compiler;

/// Process a row-query block from raw text to renderable output.
pub async fn process_query_block<D: DataAccess>(
    db: &D,
    state: &SelectionState,
    source: &str,
) -> Result<QueryOutput> {
    let resolved = state.resolve_placeholders(source);
    let block = blockql::parse_query_block(&resolved)?;
    schema::validate_query(db, &block).await?;
    let compiled = compiler::compile_query(&block)?;
    tracing::debug!(sql = compiled.sql, "executing query block");
    let rows = db.execute(&compiled.sql, &compiled.params).await?;
    Ok(QueryOutput {
        rows,
        format: block.display_format,
    })
}

/// Process a chart block from raw text to renderable chart data.
pub async fn process_chart_block<D: DataAccess>(
    db: &D,
    state: &SelectionState,
    source: &str,
) -> Result<ChartData> {
    let resolved = state.resolve_placeholders(source);
    let block = blockql::parse_chart_block(&resolved)?;
    schema::validate_chart(db, &block).await?;
    let compiled = compiler::compile_chart(&block)?;
    tracing::debug!(sql = compiled.sql, "executing chart block");
    let rows = db.execute(&compiled.sql, &compiled.params).await?;
    Ok(build_chart_data(&rows, &block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EmbeddedDb, Value};
    use crate::error::Error;
    use crate::state::{Period, SelectionState};
    use chrono::NaiveDate;

    async fn habits_db() -> EmbeddedDb {
        let db = EmbeddedDb::memory().unwrap();
        db.run("CREATE TABLE Habits (habit TEXT, date TEXT, count INTEGER)", &[])
            .await
            .unwrap();
        for (habit, date, count) in [
            ("meditation", "2024-06-12", 1),
            ("meditation", "2024-06-13", 2),
            ("reading", "2024-06-13", 5),
        ] {
            db.run(
                "INSERT INTO Habits (habit, date, count) VALUES (?, ?, ?)",
                &[Value::from(habit), Value::from(date), Value::from(count)],
            )
            .await
            .unwrap();
        }
        db
    }

    fn state_at(date: &str) -> SelectionState {
        SelectionState::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            Period::Day,
        )
    }

    #[tokio::test]
    async fn test_query_block_with_date_placeholder() {
        let db = habits_db().await;
        let state = state_at("2024-06-13");

        let output = process_query_block(
            &db,
            &state,
            "table: Habits\ncolumns: habit, count\ndateColumn: date\nstartDate: @date\nendDate: @date\norderBy: habit",
        )
        .await
        .unwrap();

        assert_eq!(output.rows.len(), 2);
        assert_eq!(
            output.rows.value(0, "habit"),
            Some(&Value::Text("meditation".to_string()))
        );
        assert_eq!(output.rows.value(1, "count"), Some(&Value::Integer(5)));
    }

    #[tokio::test]
    async fn test_unknown_column_stops_before_execution() {
        let db = habits_db().await;
        let state = state_at("2024-06-13");

        let err = process_query_block(&db, &state, "table: Habits\ncolumns: nope")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SchemaValidation { .. }));
    }

    #[tokio::test]
    async fn test_duration_pie_sums_elapsed_seconds() {
        let db = EmbeddedDb::memory().unwrap();
        db.run("CREATE TABLE Time (project TEXT, duration TEXT)", &[])
            .await
            .unwrap();
        for duration in ["01:30:00", "00:45:00"] {
            db.run(
                "INSERT INTO Time (project, duration) VALUES ('writing', ?)",
                &[Value::from(duration)],
            )
            .await
            .unwrap();
        }
        let state = state_at("2024-06-13");

        let chart = process_chart_block(
            &db,
            &state,
            "table: Time\nchartType: pie\ncategoryColumn: project\nvalueColumn: duration",
        )
        .await
        .unwrap();

        // 1h30m + 45m = 8100 seconds, not a numeric sum of the strings
        assert_eq!(chart.datasets[0].data, vec![Value::Integer(8100)]);
        assert_eq!(chart.labels, vec!["writing | 02:15:00"]);
    }
}
