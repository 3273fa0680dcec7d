//! Error type for block configuration parsing

use thiserror::Error;

/// Error produced when block text or widget attributes fail the
/// required-field or consistency checks. Parsing never returns a partial
/// configuration: it is the full typed config or one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required key '{key}'")]
    MissingKey { key: &'static str },

    #[error("missing required attribute '{name}'")]
    MissingAttribute { name: String },

    #[error("{columns} filterColumn entries but {values} filterValue entries; the lists must match")]
    FilterMismatch { columns: usize, values: usize },

    #[error("unknown chartType '{value}' (expected pie, line or bar)")]
    UnknownChartType { value: String },

    #[error("invalid date '{value}' for '{key}' (expected YYYY-MM-DD)")]
    InvalidDate { key: &'static str, value: String },
}
