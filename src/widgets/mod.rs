//! Reactive widget bindings
//!
//! Counters, boolean switches and text fields embedded in documents.
//! Each widget instance is an independent sequential state machine:
//!
//! ```text
//! Uninitialized -> Loading -> Ready <-> Saving
//!        \            |         |         |
//!         +-----------+----> Error <------+
//! ```
//!
//! `Error` is reachable from every state, shows the fixed `ERR` token,
//! and leaves the widget subscribed to date changes so it can recover on
//! the next successful load. Widgets whose `date` attribute is the
//! `@date` sentinel reload on every selection-state broadcast; widgets
//! bound to a literal date never react.

pub mod store;

mod counter;
mod switch;
mod text;

pub use counter::CounterWidget;
pub use store::{TableCapabilities, WidgetStore};
pub use switch::SwitchWidget;
pub use text::TextWidget;

use std::collections::HashMap;

use blockql::ConfigError;

use crate::error::{Error, Result};
use crate::state::SelectionState;
use crate::validation::is_valid_identifier;

/// Display token for a widget in the error state
pub const ERROR_TOKEN: &str = "ERR";

/// Widget lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    Saving,
    Error,
}

/// The widget's date attribute: a literal `YYYY-MM-DD`, or the `@date`
/// sentinel tying it to the shared selection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateAttr {
    Linked,
    Fixed(String),
}

/// Declarative attributes every widget kind shares, read from the host's
/// attribute map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetAttrs {
    /// Natural-key value identifying the row ("meditation", "mood", ...)
    pub key: String,
    pub table: String,
    pub key_column: String,
    pub value_column: String,
    pub date_column: String,
    pub date: DateAttr,
}

impl WidgetAttrs {
    /// Parse and validate the attribute map. Missing attributes and
    /// unsafe column names are configuration errors; the widget goes
    /// straight to `Error` without ever loading.
    pub fn from_map(attrs: &HashMap<String, String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            attrs
                .get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    Error::Config(ConfigError::MissingAttribute {
                        name: name.to_string(),
                    })
                })
        };

        let key = required("key")?;
        let table = required("table")?;
        let key_column = required("key-column")?;
        let value_column = required("value-column")?;
        let date_column = required("date-column")?;

        for column in [&key_column, &value_column, &date_column] {
            if !is_valid_identifier(column) {
                return Err(Error::InvalidIdentifier {
                    name: column.clone(),
                });
            }
        }

        let date = match attrs.get("date").map(String::as_str).unwrap_or("@date") {
            "@date" => DateAttr::Linked,
            literal => DateAttr::Fixed(literal.to_string()),
        };

        Ok(Self {
            key,
            table,
            key_column,
            value_column,
            date_column,
            date,
        })
    }

    /// The date this widget reads and writes right now.
    pub fn effective_date(&self, state: &SelectionState) -> String {
        match &self.date {
            DateAttr::Linked => state.selected_date().format("%Y-%m-%d").to_string(),
            DateAttr::Fixed(date) => date.clone(),
        }
    }

    /// True when the widget follows the shared selection state.
    pub fn is_date_linked(&self) -> bool {
        self.date == DateAttr::Linked
    }
}
