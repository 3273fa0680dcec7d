//! Line-oriented block parser
//!
//! Blocks are `key: value` pairs, one per line. Lines split on the first
//! `:` only, so values may themselves contain colons (timestamps, URLs).
//! Chart blocks additionally allow a nested `chartOptions: { ... }`
//! sub-block whose values coerce to native booleans/numbers.

use std::collections::BTreeMap;

use crate::config::*;
use crate::error::ConfigError;

/// Parse a row-query block.
pub fn parse_query_block(source: &str) -> Result<QueryBlock, ConfigError> {
    let mut table = None;
    let mut columns = None;
    let mut filter_columns: Option<Vec<String>> = None;
    let mut filter_values: Option<Vec<String>> = None;
    let mut date_column = None;
    let mut start_date = None;
    let mut end_date = None;
    let mut order_by = None;
    let mut order_direction = OrderDirection::default();
    let mut limit = None;
    let mut display_format = DisplayFormat::default();

    for line in source.lines() {
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };

        match key {
            "table" => table = Some(value),
            "columns" => columns = Some(split_list(&value)),
            "filterColumn" => filter_columns = Some(split_list(&value)),
            "filterValue" => filter_values = Some(split_list(&value)),
            "dateColumn" => date_column = Some(value),
            "startDate" => start_date = Some(value),
            "endDate" => end_date = Some(value),
            "orderBy" => order_by = Some(value),
            "orderDirection" => match value.to_ascii_lowercase().as_str() {
                "asc" => order_direction = OrderDirection::Asc,
                "desc" => order_direction = OrderDirection::Desc,
                _ => {} // unrecognized direction, keep the default
            },
            "limit" => {
                if let Ok(n) = value.parse::<i64>() {
                    limit = Some(n);
                }
            }
            "displayFormat" => match value.to_ascii_lowercase().as_str() {
                "list" => display_format = DisplayFormat::List,
                "table" => display_format = DisplayFormat::Table,
                _ => display_format = DisplayFormat::List,
            },
            _ => {} // unknown keys are ignored
        }
    }

    let table = table.ok_or(ConfigError::MissingKey { key: "table" })?;
    let filters = zip_filters(filter_columns, filter_values)?;

    Ok(QueryBlock {
        table,
        columns,
        filters,
        date_column,
        start_date,
        end_date,
        order_by,
        order_direction,
        limit,
        display_format,
    })
}

/// Parse a chart block. The chart kind is decided here, so each variant
/// carries exactly its required fields.
pub fn parse_chart_block(source: &str) -> Result<ChartBlock, ConfigError> {
    let mut raw: BTreeMap<&str, String> = BTreeMap::new();
    let mut y_columns: Option<Vec<String>> = None;
    let mut options: ChartOptions = BTreeMap::new();
    let mut in_options = false;

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed == "chartOptions: {" {
            in_options = true;
            continue;
        }
        if in_options {
            if trimmed == "}" {
                in_options = false;
            } else if let Some((key, value)) = split_key_value(trimmed) {
                let value = value.trim_end_matches(',').trim().to_string();
                options.insert(key.to_string(), coerce_option_value(&value));
            }
            continue;
        }

        let Some((key, value)) = split_key_value(trimmed) else {
            continue;
        };
        if key == "yColumns" {
            y_columns = Some(split_list(&value));
        } else {
            raw.insert(key, value);
        }
    }

    let table = raw
        .remove("table")
        .ok_or(ConfigError::MissingKey { key: "table" })?;
    let chart_type = raw
        .remove("chartType")
        .ok_or(ConfigError::MissingKey { key: "chartType" })?;

    let date_column = raw.remove("dateColumn");
    let start_date = raw.remove("startDate");
    let end_date = raw.remove("endDate");

    match chart_type.as_str() {
        "pie" => {
            let category_column = raw
                .remove("categoryColumn")
                .ok_or(ConfigError::MissingKey { key: "categoryColumn" })?;
            let value_column = raw
                .remove("valueColumn")
                .ok_or(ConfigError::MissingKey { key: "valueColumn" })?;
            Ok(ChartBlock::Pie(PieChart {
                table,
                category_column,
                value_column,
                date_column,
                start_date,
                end_date,
                options,
            }))
        }
        "line" | "bar" => {
            let kind = if chart_type == "line" {
                SeriesKind::Line
            } else {
                SeriesKind::Bar
            };
            let x_column = raw
                .remove("xColumn")
                .ok_or(ConfigError::MissingKey { key: "xColumn" })?;
            let y_columns = y_columns.ok_or(ConfigError::MissingKey { key: "yColumns" })?;
            Ok(ChartBlock::TimeSeries(TimeSeriesChart {
                table,
                kind,
                x_column,
                y_columns,
                category_column: raw.remove("categoryColumn"),
                date_column,
                start_date,
                end_date,
                options,
            }))
        }
        other => Err(ConfigError::UnknownChartType {
            value: other.to_string(),
        }),
    }
}

/// Split a line on its first `:`; returns None for blank lines and lines
/// with no separator.
fn split_key_value(line: &str) -> Option<(&str, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (key, rest) = trimmed.split_once(':')?;
    Some((key.trim(), rest.trim().to_string()))
}

/// Split a comma-separated value into trimmed entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Pair filter columns with filter values. Both lists must be present
/// together and equally long; anything else fails the whole parse.
fn zip_filters(
    columns: Option<Vec<String>>,
    values: Option<Vec<String>>,
) -> Result<Vec<Filter>, ConfigError> {
    match (columns, values) {
        (None, None) => Ok(Vec::new()),
        (Some(cols), Some(vals)) if cols.len() == vals.len() => Ok(cols
            .into_iter()
            .zip(vals)
            .map(|(column, value)| Filter { column, value })
            .collect()),
        (cols, vals) => Err(ConfigError::FilterMismatch {
            columns: cols.map_or(0, |c| c.len()),
            values: vals.map_or(0, |v| v.len()),
        }),
    }
}

/// Coerce a chart option value: `true`/`false` and numbers become native
/// JSON values, everything else stays a string.
fn coerce_option_value(raw: &str) -> serde_json::Value {
    match raw {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                serde_json::Value::from(n)
            } else if let Ok(f) = raw.parse::<f64>() {
                serde_json::Value::from(f)
            } else {
                serde_json::Value::String(raw.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_block_requires_table() {
        let err = parse_query_block("columns: a, b\nlimit: 5").unwrap_err();
        assert_eq!(err, ConfigError::MissingKey { key: "table" });
    }

    #[test]
    fn query_block_value_may_contain_colons() {
        let block = parse_query_block("table: Log\nfilterColumn: note\nfilterValue: one: two")
            .unwrap();
        assert_eq!(block.filters[0].value, "one: two");
    }

    #[test]
    fn filter_list_lengths_must_match() {
        let err =
            parse_query_block("table: Log\nfilterColumn: a,b\nfilterValue: x").unwrap_err();
        assert_eq!(
            err,
            ConfigError::FilterMismatch {
                columns: 2,
                values: 1
            }
        );
    }

    #[test]
    fn matched_filter_lists_zip_in_column_order() {
        let block =
            parse_query_block("table: Log\nfilterColumn: a, b\nfilterValue: x, y").unwrap();
        assert_eq!(block.filters.len(), 2);
        assert_eq!(block.filters[0].column, "a");
        assert_eq!(block.filters[0].value, "x");
        assert_eq!(block.filters[1].column, "b");
        assert_eq!(block.filters[1].value, "y");
    }

    #[test]
    fn blank_lines_and_unknown_keys_are_ignored() {
        let block = parse_query_block("\ntable: Habits\n\nnonsense: ignored\n").unwrap();
        assert_eq!(block.table, "Habits");
        assert!(block.filters.is_empty());
    }

    #[test]
    fn invalid_limit_and_direction_fall_back() {
        let block =
            parse_query_block("table: Log\nlimit: lots\norderDirection: sideways").unwrap();
        assert_eq!(block.limit, None);
        assert_eq!(block.order_direction, OrderDirection::Asc);
    }

    #[test]
    fn display_format_defaults_to_list() {
        let block = parse_query_block("table: Log\ndisplayFormat: fancy").unwrap();
        assert_eq!(block.display_format, DisplayFormat::List);
        let block = parse_query_block("table: Log\ndisplayFormat: Table").unwrap();
        assert_eq!(block.display_format, DisplayFormat::Table);
    }

    #[test]
    fn pie_chart_requires_category_and_value() {
        let err = parse_chart_block("table: Time\nchartType: pie").unwrap_err();
        assert_eq!(err, ConfigError::MissingKey { key: "categoryColumn" });

        let chart = parse_chart_block(
            "table: Time\nchartType: pie\ncategoryColumn: project\nvalueColumn: duration",
        )
        .unwrap();
        assert!(matches!(chart, ChartBlock::Pie(_)));
    }

    #[test]
    fn line_chart_requires_x_and_y() {
        let err = parse_chart_block("table: Weight\nchartType: line\nxColumn: date").unwrap_err();
        assert_eq!(err, ConfigError::MissingKey { key: "yColumns" });
    }

    #[test]
    fn unknown_chart_type_fails() {
        let err = parse_chart_block("table: T\nchartType: donut").unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownChartType {
                value: "donut".to_string()
            }
        );
    }

    #[test]
    fn chart_options_coerce_values() {
        let chart = parse_chart_block(
            "table: Weight\nchartType: bar\nxColumn: date\nyColumns: kg\nchartOptions: {\n  showLegend: true,\n  aspectRatio: 1.5,\n  title: Weight over time\n}",
        )
        .unwrap();
        let options = chart.options();
        assert_eq!(options["showLegend"], serde_json::Value::Bool(true));
        assert_eq!(options["aspectRatio"], serde_json::Value::from(1.5));
        assert_eq!(
            options["title"],
            serde_json::Value::String("Weight over time".to_string())
        );
    }

    #[test]
    fn chart_date_range_needs_all_three_keys() {
        let chart = parse_chart_block(
            "table: Time\nchartType: pie\ncategoryColumn: project\nvalueColumn: duration\ndateColumn: date\nstartDate: 2024-01-01",
        )
        .unwrap();
        assert!(chart.date_range().is_none());
    }
}
