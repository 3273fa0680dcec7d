//! Placeholder substitution
//!
//! A pure pre-pass over raw block text, driven entirely by a selection
//! [`Snapshot`]: no hidden state, so it tests against literal fixtures.
//! Runs before parsing; the parser never sees a placeholder.

use chrono::Datelike;

use super::{period_id, Snapshot};

/// Replace every date/period placeholder in `source`.
///
/// Longer tokens are replaced before the `@date`/`@day` family so a
/// token is never clipped by a shorter prefix replacement.
pub fn replace_placeholders(source: &str, snapshot: &Snapshot) -> String {
    let date = snapshot.selected_date;
    let week = date.iso_week();

    source
        .replace("@startDate", &snapshot.period_start.format("%Y-%m-%d").to_string())
        .replace("@endDate", &snapshot.period_end.format("%Y-%m-%d").to_string())
        .replace("@periodId", &period_id(date, snapshot.period))
        .replace("@date", &date.format("%Y-%m-%d").to_string())
        .replace("@year", &date.year().to_string())
        .replace("@quarter", &(date.month0() / 3 + 1).to_string())
        .replace("@month", &format!("{:02}", date.month()))
        .replace("@week", &format!("W{:02}", week.week()))
        .replace("@day", &format!("{:02}", date.day()))
}
