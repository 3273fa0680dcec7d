//! Query output
//!
//! The shape handed to the host's rendering layer for row-oriented
//! blocks, plus the plain-text list/table renderings the CLI uses.

use blockql::DisplayFormat;

use crate::db::Rows;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub rows: Rows,
    pub format: DisplayFormat,
}

impl QueryOutput {
    /// Render per the block's `displayFormat`.
    pub fn to_display_string(&self) -> String {
        match self.format {
            DisplayFormat::List => self.to_list_string(),
            DisplayFormat::Table => self.to_table_string(),
        }
    }

    /// One line per row: `col: value | col: value`, NULLs as `N/A`.
    pub fn to_list_string(&self) -> String {
        self.rows
            .rows
            .iter()
            .map(|row| {
                self.rows
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| {
                        let shown = match value {
                            crate::db::Value::Null => "N/A".to_string(),
                            other => other.display(),
                        };
                        format!("{column}: {shown}")
                    })
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Aligned header + separator + rows, NULLs as empty cells.
    pub fn to_table_string(&self) -> String {
        let columns = &self.rows.columns;
        if columns.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
        let cells: Vec<Vec<String>> = self
            .rows
            .rows
            .iter()
            .map(|row| row.iter().map(|value| value.display()).collect())
            .collect();
        for row in &cells {
            for (index, cell) in row.iter().enumerate() {
                if index < widths.len() {
                    widths[index] = widths[index].max(cell.len());
                }
            }
        }

        let render_row = |cells: &[String]| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(cells.len() + 2);
        lines.push(render_row(columns));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &cells {
            lines.push(render_row(row));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;

    fn output(format: DisplayFormat) -> QueryOutput {
        QueryOutput {
            rows: Rows {
                columns: vec!["habit".to_string(), "count".to_string()],
                rows: vec![
                    vec![Value::from("meditation"), Value::from(3)],
                    vec![Value::from("reading"), Value::Null],
                ],
            },
            format,
        }
    }

    #[test]
    fn test_list_rendering() {
        let text = output(DisplayFormat::List).to_display_string();
        assert_eq!(
            text,
            "habit: meditation | count: 3\nhabit: reading | count: N/A"
        );
    }

    #[test]
    fn test_table_rendering_aligns_columns() {
        let text = output(DisplayFormat::Table).to_display_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "habit       count");
        assert!(lines[1].starts_with("----------"));
        assert_eq!(lines[2], "meditation  3");
        assert_eq!(lines[3], "reading");
    }

    #[test]
    fn test_empty_result_renders_empty() {
        let empty = QueryOutput {
            rows: Rows::default(),
            format: DisplayFormat::Table,
        };
        assert_eq!(empty.to_display_string(), "");
    }
}
