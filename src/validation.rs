//! Identifier safety
//!
//! Table and column names are the only user-controlled strings that ever
//! reach SQL text, and they only do so through [`quote_identifier`].
//! Values never pass through here; they always travel as bind parameters.

use crate::error::{Error, Result};

/// True if `name` is a safe SQL identifier: non-empty, ASCII letters,
/// digits and underscores only.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate `name` and wrap it in double quotes for interpolation into a
/// SQL statement.
///
/// Rejection is a configuration error: callers must surface it, never
/// silently drop the clause that referenced the name.
pub fn quote_identifier(name: &str) -> Result<String> {
    if is_valid_identifier(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(Error::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}
