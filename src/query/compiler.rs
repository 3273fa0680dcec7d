//! Query compilation
//!
//! Deterministically turns a validated block configuration into one SQL
//! statement plus its positional parameters. Every identifier passes
//! through [`quote_identifier`]; every value is a bind parameter. Filter
//! conditions always precede the date-range condition so compiled SQL is
//! stable for golden tests.

use blockql::{ChartBlock, ConfigError, PieChart, QueryBlock, TimeSeriesChart};
use chrono::NaiveDate;

use crate::db::Value;
use crate::error::Result;
use crate::validation::quote_identifier;

/// A compiled statement. The parameter count always equals the
/// placeholder count.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compile a row-query block.
pub fn compile_query(block: &QueryBlock) -> Result<CompiledQuery> {
    let select_columns = match &block.columns {
        Some(columns) => columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Result<Vec<_>>>()?
            .join(", "),
        None => "*".to_string(),
    };

    let mut params = Vec::new();
    let mut conditions = Vec::new();

    for filter in &block.filters {
        conditions.push(format!("{} = ?", quote_identifier(&filter.column)?));
        params.push(Value::from(filter.value.as_str()));
    }

    if let (Some(column), Some(start), Some(end)) =
        (&block.date_column, &block.start_date, &block.end_date)
    {
        let (clause, range_params) = date_range_condition(column, start, end)?;
        conditions.push(clause);
        params.extend(range_params);
    }

    let mut sql = format!(
        "SELECT {} FROM {}",
        select_columns,
        quote_identifier(&block.table)?
    );
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    if let Some(order_by) = &block.order_by {
        let direction = match block.order_direction {
            blockql::OrderDirection::Asc => "ASC",
            blockql::OrderDirection::Desc => "DESC",
        };
        sql.push_str(&format!(
            " ORDER BY {} {}",
            quote_identifier(order_by)?,
            direction
        ));
    }
    if let Some(limit) = block.limit {
        sql.push_str(" LIMIT ?");
        params.push(Value::from(limit));
    }

    Ok(CompiledQuery { sql, params })
}

/// Compile a chart block.
pub fn compile_chart(block: &ChartBlock) -> Result<CompiledQuery> {
    match block {
        ChartBlock::Pie(pie) => compile_pie(pie),
        ChartBlock::TimeSeries(ts) => compile_time_series(ts),
    }
}

/// True when the pie aggregation must treat the value column as
/// `HH:MM:SS` durations and sum elapsed seconds instead of raw values.
pub fn is_duration_aggregation(table: &str, value_column: &str) -> bool {
    table.eq_ignore_ascii_case("time") && value_column == "duration"
}

fn compile_pie(pie: &PieChart) -> Result<CompiledQuery> {
    let category = quote_identifier(&pie.category_column)?;
    let value = quote_identifier(&pie.value_column)?;

    // Time-tracking tables store durations as HH:MM:SS strings; summed
    // as seconds via epoch differences, not as numbers.
    let aggregate = if is_duration_aggregation(&pie.table, &pie.value_column) {
        format!(
            "SUM(strftime('%s', '1970-01-01T' || {value}) - strftime('%s', '1970-01-01T00:00:00'))"
        )
    } else {
        format!("SUM({value})")
    };

    let mut sql = format!(
        "SELECT {category}, {aggregate} AS value FROM {}",
        quote_identifier(&pie.table)?
    );
    let mut params = Vec::new();
    if let Some((column, start, end)) = pie.date_range() {
        let (clause, range_params) = date_range_condition(column, start, end)?;
        sql.push_str(&format!(" WHERE {clause}"));
        params.extend(range_params);
    }
    sql.push_str(&format!(" GROUP BY {category} ORDER BY value DESC"));

    Ok(CompiledQuery { sql, params })
}

fn compile_time_series(ts: &TimeSeriesChart) -> Result<CompiledQuery> {
    let x = quote_identifier(&ts.x_column)?;
    let mut select_columns = vec![x.clone()];
    let category = ts
        .category_column
        .as_deref()
        .map(quote_identifier)
        .transpose()?;
    if let Some(category) = &category {
        select_columns.push(category.clone());
    }
    for y in &ts.y_columns {
        select_columns.push(quote_identifier(y)?);
    }

    let mut sql = format!(
        "SELECT {} FROM {}",
        select_columns.join(", "),
        quote_identifier(&ts.table)?
    );
    let mut params = Vec::new();
    if let Some((column, start, end)) = ts.date_range() {
        let (clause, range_params) = date_range_condition(column, start, end)?;
        sql.push_str(&format!(" WHERE {clause}"));
        params.extend(range_params);
    }
    sql.push_str(&format!(" ORDER BY {x}"));
    if let Some(category) = &category {
        sql.push_str(&format!(", {category}"));
    }

    Ok(CompiledQuery { sql, params })
}

/// Build `"col" >= ? AND "col" < ?` with the upper bound set to the day
/// *after* the supplied end date, so an end date is inclusive of its
/// whole day regardless of any stored time-of-day. Pure calendar
/// arithmetic; no timezone is involved.
fn date_range_condition(column: &str, start: &str, end: &str) -> Result<(String, Vec<Value>)> {
    parse_block_date(start, "startDate")?;
    let end_date = parse_block_date(end, "endDate")?;
    let upper_bound = end_date
        .succ_opt()
        .ok_or(ConfigError::InvalidDate {
            key: "endDate",
            value: end.to_string(),
        })
        .map_err(crate::error::Error::from)?;

    let quoted = quote_identifier(column)?;
    Ok((
        format!("{quoted} >= ? AND {quoted} < ?"),
        vec![
            Value::from(start),
            Value::from(upper_bound.format("%Y-%m-%d").to_string()),
        ],
    ))
}

fn parse_block_date(value: &str, key: &'static str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        crate::error::Error::from(ConfigError::InvalidDate {
            key,
            value: value.to_string(),
        })
    })
}
