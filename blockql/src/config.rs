//! Typed block configurations
//!
//! Each block kind parses into its own configuration type, so downstream
//! code (schema validation, query compilation) never narrows on the
//! presence of optional keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A row-oriented query block (`sql` code blocks in notes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryBlock {
    /// Target table
    pub table: String,
    /// Columns to select (None = *)
    pub columns: Option<Vec<String>>,
    /// Equality filters, in the order the columns were written
    pub filters: Vec<Filter>,
    /// Date-range filtering (all three required for a range to apply)
    pub date_column: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Ordering
    pub order_by: Option<String>,
    pub order_direction: OrderDirection,
    /// Row limit
    pub limit: Option<i64>,
    /// How the host should display the result
    pub display_format: DisplayFormat,
}

/// A single `column = value` equality filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl Default for OrderDirection {
    fn default() -> Self {
        Self::Asc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayFormat {
    List,
    Table,
}

impl Default for DisplayFormat {
    fn default() -> Self {
        Self::List
    }
}

/// Chart option values as written in the nested `chartOptions` block,
/// with `true`/`false`/numeric strings coerced to native JSON values.
pub type ChartOptions = BTreeMap<String, serde_json::Value>;

/// A chart block, decided at parse time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChartBlock {
    Pie(PieChart),
    TimeSeries(TimeSeriesChart),
}

/// Pie chart: one aggregated value per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    pub table: String,
    pub category_column: String,
    pub value_column: String,
    pub date_column: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    Line,
    Bar,
}

/// Line/bar chart: x column plus one or more y columns, optionally split
/// into series by a category column (the split happens in post-processing,
/// not in SQL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesChart {
    pub table: String,
    pub kind: SeriesKind,
    pub x_column: String,
    pub y_columns: Vec<String>,
    pub category_column: Option<String>,
    pub date_column: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub options: ChartOptions,
}

fn complete_range<'a>(
    column: &'a Option<String>,
    start: &'a Option<String>,
    end: &'a Option<String>,
) -> Option<(&'a str, &'a str, &'a str)> {
    match (column, start, end) {
        (Some(c), Some(s), Some(e)) => Some((c, s, e)),
        _ => None,
    }
}

impl PieChart {
    /// The configured date range, if the block carries a complete one
    pub fn date_range(&self) -> Option<(&str, &str, &str)> {
        complete_range(&self.date_column, &self.start_date, &self.end_date)
    }
}

impl TimeSeriesChart {
    /// The configured date range, if the block carries a complete one
    pub fn date_range(&self) -> Option<(&str, &str, &str)> {
        complete_range(&self.date_column, &self.start_date, &self.end_date)
    }
}

impl ChartBlock {
    pub fn table(&self) -> &str {
        match self {
            ChartBlock::Pie(pie) => &pie.table,
            ChartBlock::TimeSeries(ts) => &ts.table,
        }
    }

    pub fn options(&self) -> &ChartOptions {
        match self {
            ChartBlock::Pie(pie) => &pie.options,
            ChartBlock::TimeSeries(ts) => &ts.options,
        }
    }

    /// The configured date range, if the block carries a complete one
    pub fn date_range(&self) -> Option<(&str, &str, &str)> {
        match self {
            ChartBlock::Pie(pie) => pie.date_range(),
            ChartBlock::TimeSeries(ts) => ts.date_range(),
        }
    }
}
