//! Chart data assembly
//!
//! Turns query rows into a chart-library-agnostic `{type, labels,
//! datasets, options}` structure for the host to render. Series
//! splitting for line/bar charts happens here, not in SQL; colors and
//! other visual styling are host concerns and never appear in this
//! structure.

use serde::Serialize;

use blockql::{ChartBlock, ChartOptions, PieChart, SeriesKind, TimeSeriesChart};

use crate::db::{Rows, Value};
use crate::query::compiler::is_duration_aggregation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Pie,
    Line,
    Bar,
}

/// One plotted series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Value>,
}

/// The complete renderable chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub options: ChartOptions,
}

/// Assemble chart data from the rows the compiled chart query returned.
pub fn build_chart_data(rows: &Rows, block: &ChartBlock) -> ChartData {
    match block {
        ChartBlock::Pie(pie) => build_pie(rows, pie),
        ChartBlock::TimeSeries(ts) => build_time_series(rows, ts),
    }
}

fn build_pie(rows: &Rows, pie: &PieChart) -> ChartData {
    let duration = is_duration_aggregation(&pie.table, &pie.value_column);

    let mut labels = Vec::with_capacity(rows.len());
    let mut data = Vec::with_capacity(rows.len());
    for row in &rows.rows {
        let category = row.first().map(Value::display).unwrap_or_default();
        let value = row.get(1).cloned().unwrap_or(Value::Null);
        // Duration pies label each slice with its summed time
        if duration {
            let seconds = value.as_f64().unwrap_or(0.0) as i64;
            labels.push(format!("{category} | {}", format_seconds(seconds)));
        } else {
            labels.push(category);
        }
        data.push(value);
    }

    ChartData {
        chart_type: ChartType::Pie,
        labels,
        datasets: vec![Dataset {
            label: pie.value_column.clone(),
            data,
        }],
        options: pie.options.clone(),
    }
}

fn build_time_series(rows: &Rows, ts: &TimeSeriesChart) -> ChartData {
    let chart_type = match ts.kind {
        SeriesKind::Line => ChartType::Line,
        SeriesKind::Bar => ChartType::Bar,
    };

    let (labels, datasets) = if ts.category_column.is_some() {
        grouped_series(rows)
    } else {
        ungrouped_series(rows, ts)
    };

    ChartData {
        chart_type,
        labels,
        datasets,
        options: ts.options.clone(),
    }
}

/// Columns are `x, series, y`: one dataset per series value, in first-seen
/// order, with labels taken from the first series' x values.
fn grouped_series(rows: &Rows) -> (Vec<String>, Vec<Dataset>) {
    let mut groups: Vec<(String, Vec<String>, Vec<Value>)> = Vec::new();

    for row in &rows.rows {
        let x = row.first().map(Value::display).unwrap_or_default();
        let series = row.get(1).map(Value::display).unwrap_or_default();
        let y = row.get(2).cloned().unwrap_or(Value::Null);

        match groups.iter_mut().find(|(name, _, _)| *name == series) {
            Some((_, xs, ys)) => {
                xs.push(x);
                ys.push(y);
            }
            None => groups.push((series, vec![x], vec![y])),
        }
    }

    let labels = groups.first().map(|(_, xs, _)| xs.clone()).unwrap_or_default();
    let datasets = groups
        .into_iter()
        .map(|(label, _, data)| Dataset { label, data })
        .collect();
    (labels, datasets)
}

/// Columns are `x, y1, y2, ...`: labels from x, one dataset per y column.
fn ungrouped_series(rows: &Rows, ts: &TimeSeriesChart) -> (Vec<String>, Vec<Dataset>) {
    let labels = rows
        .rows
        .iter()
        .map(|row| row.first().map(Value::display).unwrap_or_default())
        .collect();

    let datasets = ts
        .y_columns
        .iter()
        .enumerate()
        .map(|(index, label)| Dataset {
            label: label.clone(),
            data: rows
                .rows
                .iter()
                .map(|row| row.get(index + 1).cloned().unwrap_or(Value::Null))
                .collect(),
        })
        .collect();
    (labels, datasets)
}

/// `HH:MM:SS` from a second count
fn format_seconds(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pie_block(table: &str, value_column: &str) -> PieChart {
        PieChart {
            table: table.to_string(),
            category_column: "category".to_string(),
            value_column: value_column.to_string(),
            date_column: None,
            start_date: None,
            end_date: None,
            options: Default::default(),
        }
    }

    #[test]
    fn test_pie_labels_and_values() {
        let rows = Rows {
            columns: vec!["category".to_string(), "value".to_string()],
            rows: vec![
                vec![Value::from("food"), Value::from(120)],
                vec![Value::from("rent"), Value::from(900)],
            ],
        };
        let chart = build_pie(&rows, &pie_block("Expenses", "amount"));
        assert_eq!(chart.labels, vec!["food", "rent"]);
        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].data[1], Value::Integer(900));
    }

    #[test]
    fn test_duration_pie_labels_carry_formatted_time() {
        let rows = Rows {
            columns: vec!["project".to_string(), "value".to_string()],
            rows: vec![vec![Value::from("writing"), Value::from(8100)]],
        };
        let chart = build_pie(&rows, &pie_block("Time", "duration"));
        assert_eq!(chart.labels, vec!["writing | 02:15:00"]);
    }

    #[test]
    fn test_grouped_series_split_in_first_seen_order() {
        let rows = Rows {
            columns: vec!["date".to_string(), "person".to_string(), "kg".to_string()],
            rows: vec![
                vec![Value::from("2024-01-01"), Value::from("ana"), Value::from(60)],
                vec![Value::from("2024-01-01"), Value::from("ben"), Value::from(80)],
                vec![Value::from("2024-01-02"), Value::from("ana"), Value::from(59)],
                vec![Value::from("2024-01-02"), Value::from("ben"), Value::from(81)],
            ],
        };
        let (labels, datasets) = grouped_series(&rows);
        assert_eq!(labels, vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].label, "ana");
        assert_eq!(datasets[0].data, vec![Value::Integer(60), Value::Integer(59)]);
        assert_eq!(datasets[1].label, "ben");
    }

    #[test]
    fn test_ungrouped_series_one_dataset_per_y_column() {
        let ts = TimeSeriesChart {
            table: "Weight".to_string(),
            kind: SeriesKind::Line,
            x_column: "date".to_string(),
            y_columns: vec!["kg".to_string(), "bmi".to_string()],
            category_column: None,
            date_column: None,
            start_date: None,
            end_date: None,
            options: Default::default(),
        };
        let rows = Rows {
            columns: vec!["date".to_string(), "kg".to_string(), "bmi".to_string()],
            rows: vec![
                vec![Value::from("2024-01-01"), Value::from(60), Value::from(21.1)],
                vec![Value::from("2024-01-02"), Value::from(59), Value::from(20.9)],
            ],
        };
        let (labels, datasets) = ungrouped_series(&rows, &ts);
        assert_eq!(labels.len(), 2);
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[1].label, "bmi");
        assert_eq!(datasets[1].data[0], Value::Real(21.1));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0), "00:00:00");
        assert_eq!(format_seconds(8100), "02:15:00");
        assert_eq!(format_seconds(3661), "01:01:01");
    }
}
