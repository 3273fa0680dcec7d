//! Error types for notelite
//!
//! One taxonomy for the whole crate: configuration problems stop before
//! the database, schema problems carry the available columns for user
//! feedback, and backend failures are surfaced, never retried.

use thiserror::Error;

/// The main error type for notelite operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Configuration Errors (never reach the database)
    // ==========================================================================
    #[error("{0}")]
    Config(#[from] blockql::ConfigError),

    #[error("invalid identifier '{name}': only letters, digits and underscores are allowed")]
    InvalidIdentifier { name: String },

    // ==========================================================================
    // Schema Errors
    // ==========================================================================
    #[error("{message}")]
    SchemaValidation {
        message: String,
        /// Columns that do exist, so the host can render suggestions
        available_columns: Vec<String>,
    },

    // ==========================================================================
    // Write-path Errors
    // ==========================================================================
    #[error(
        "table '{table}' is missing a UNIQUE index on ({key_column}, {date_column}); \
         run: CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_{key_column}_{date_column} \
         ON \"{table}\" (\"{key_column}\", \"{date_column}\")"
    )]
    MissingUniqueIndex {
        table: String,
        key_column: String,
        date_column: String,
    },

    // ==========================================================================
    // Backend Errors (embedded engine, file I/O, remote HTTP)
    // ==========================================================================
    #[error("backend error: {message}")]
    Backend { message: String },
}

/// Result type alias for notelite operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend {
            message: message.into(),
        }
    }

    /// True when a backend error says the named column does not exist.
    ///
    /// The surrogate-key probe uses this to distinguish "this table has no
    /// uuid column" (expected, fall back to the upsert path) from real
    /// failures. Both engines report the condition as message text only.
    pub fn is_missing_column(&self, column: &str) -> bool {
        match self {
            Error::Backend { message } => {
                let lower = message.to_ascii_lowercase();
                (lower.contains("no such column") || lower.contains("does not exist"))
                    && lower.contains(&column.to_ascii_lowercase())
            }
            _ => false,
        }
    }

    /// True when a backend error says an ON CONFLICT target has no
    /// matching UNIQUE constraint.
    pub fn is_conflict_target_mismatch(&self) -> bool {
        match self {
            Error::Backend { message } => message.contains("ON CONFLICT clause does not match"),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Backend {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Backend {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Backend {
            message: err.to_string(),
        }
    }
}
