//! Counter widget
//!
//! A non-negative tally for a keyed row (habit completions, glasses of
//! water). Clicks step the value by ±1, clamped at zero; the display
//! updates optimistically and the widget drops to `Error` if the save
//! fails.

use std::collections::HashMap;
use std::sync::Arc;

use super::store::WidgetStore;
use super::{Phase, WidgetAttrs, ERROR_TOKEN};
use crate::db::{DataAccess, Value};
use crate::state::SelectionState;

pub struct CounterWidget<D> {
    attrs: Option<WidgetAttrs>,
    store: Arc<WidgetStore<D>>,
    state: Arc<SelectionState>,
    phase: Phase,
    value: i64,
    error: Option<String>,
    load_seq: u64,
}

impl<D: DataAccess> CounterWidget<D> {
    /// Build from the host's attribute map. Invalid configuration puts
    /// the widget straight into `Error` without touching the database.
    pub fn new(
        store: Arc<WidgetStore<D>>,
        state: Arc<SelectionState>,
        attrs: &HashMap<String, String>,
    ) -> Self {
        let (attrs, phase, error) = match WidgetAttrs::from_map(attrs) {
            Ok(parsed) => (Some(parsed), Phase::Uninitialized, None),
            Err(err) => (None, Phase::Error, Some(err.to_string())),
        };
        Self {
            attrs,
            store,
            state,
            phase,
            value: 0,
            error,
            load_seq: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// What the control shows: the value, or the error token.
    pub fn display(&self) -> String {
        if self.phase == Phase::Error {
            ERROR_TOKEN.to_string()
        } else {
            self.value.to_string()
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.phase == Phase::Error
    }

    /// True when the widget follows `@date` and must reload on selection
    /// changes.
    pub fn reacts_to_date_changes(&self) -> bool {
        self.attrs
            .as_ref()
            .is_some_and(WidgetAttrs::is_date_linked)
    }

    /// Fetch the current value for the effective date. A missing row
    /// reads as zero. Clears a previous error on success.
    pub async fn load(&mut self) {
        let Some(attrs) = self.attrs.clone() else {
            return;
        };
        self.load_seq += 1;
        let seq = self.load_seq;
        self.phase = Phase::Loading;

        let date = attrs.effective_date(&self.state);
        let result = self.store.fetch_value(&attrs, &date).await;

        // A newer load superseded this one while it was in flight
        if seq != self.load_seq {
            return;
        }
        match result {
            Ok(value) => {
                self.value = value.as_ref().and_then(Value::as_i64).unwrap_or(0);
                self.phase = Phase::Ready;
                self.error = None;
            }
            Err(err) => {
                self.phase = Phase::Error;
                self.error = Some(err.to_string());
            }
        }
    }

    pub async fn increment(&mut self) {
        self.save(1).await;
    }

    pub async fn decrement(&mut self) {
        self.save(-1).await;
    }

    /// Reload when the shared selection date changes. Fixed-date widgets
    /// ignore the event; an errored widget uses it to recover.
    pub async fn handle_date_change(&mut self) {
        if self.reacts_to_date_changes() {
            self.load().await;
        }
    }

    async fn save(&mut self, delta: i64) {
        if !matches!(self.phase, Phase::Ready) {
            return;
        }
        let Some(attrs) = self.attrs.clone() else {
            return;
        };

        let new_value = (self.value + delta).max(0);
        self.value = new_value; // optimistic
        self.phase = Phase::Saving;

        let date = attrs.effective_date(&self.state);
        match self
            .store
            .upsert_value(&attrs, &date, Value::from(new_value))
            .await
        {
            Ok(()) => {
                self.phase = Phase::Ready;
                self.error = None;
            }
            Err(err) => {
                self.phase = Phase::Error;
                self.error = Some(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::EmbeddedDb;
    use crate::state::Period;
    use chrono::NaiveDate;

    fn attr_map(date: &str) -> HashMap<String, String> {
        [
            ("key", "meditation"),
            ("table", "Habits"),
            ("key-column", "habit"),
            ("value-column", "count"),
            ("date-column", "date"),
            ("date", date),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    async fn setup() -> (
        Arc<EmbeddedDb>,
        Arc<WidgetStore<EmbeddedDb>>,
        Arc<SelectionState>,
    ) {
        let db = Arc::new(EmbeddedDb::memory().unwrap());
        db.run(
            "CREATE TABLE Habits (habit TEXT, date TEXT, count INTEGER, UNIQUE(habit, date))",
            &[],
        )
        .await
        .unwrap();
        let state = SelectionState::new(
            NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
            Period::Day,
        );
        (db.clone(), Arc::new(WidgetStore::new(db)), Arc::new(state))
    }

    #[tokio::test]
    async fn test_missing_attributes_error_without_loading() {
        let (_db, store, state) = setup().await;
        let widget = CounterWidget::new(store, state, &HashMap::new());
        assert_eq!(widget.phase(), Phase::Error);
        assert_eq!(widget.display(), ERROR_TOKEN);
        assert!(widget.is_disabled());
    }

    #[tokio::test]
    async fn test_load_then_increment_persists() {
        let (_db, store, state) = setup().await;
        let mut widget = CounterWidget::new(store.clone(), state, &attr_map("@date"));

        widget.load().await;
        assert_eq!(widget.phase(), Phase::Ready);
        assert_eq!(widget.value(), 0);

        widget.increment().await;
        widget.increment().await;
        assert_eq!(widget.phase(), Phase::Ready);
        assert_eq!(widget.value(), 2);

        let attrs = WidgetAttrs::from_map(&attr_map("@date")).unwrap();
        assert_eq!(
            store.fetch_value(&attrs, "2024-06-13").await.unwrap(),
            Some(Value::Integer(2))
        );
    }

    #[tokio::test]
    async fn test_decrement_clamps_at_zero() {
        let (_db, store, state) = setup().await;
        let mut widget = CounterWidget::new(store, state, &attr_map("@date"));
        widget.load().await;

        widget.decrement().await;
        assert_eq!(widget.value(), 0);
        assert_eq!(widget.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_missing_table_shows_error_token() {
        let (_db, store, state) = setup().await;
        // Point the widget at a table that does not exist
        let mut map = attr_map("@date");
        map.insert("table".to_string(), "Missing".to_string());
        let mut widget = CounterWidget::new(store, state, &map);

        widget.load().await;
        assert_eq!(widget.phase(), Phase::Error);
        assert_eq!(widget.display(), ERROR_TOKEN);
    }

    #[tokio::test]
    async fn test_date_change_reloads_only_linked_widgets() {
        let (_db, store, state) = setup().await;
        store
            .upsert_value(
                &WidgetAttrs::from_map(&attr_map("@date")).unwrap(),
                "2024-06-14",
                Value::from(9),
            )
            .await
            .unwrap();

        let mut linked = CounterWidget::new(store.clone(), state.clone(), &attr_map("@date"));
        let mut fixed =
            CounterWidget::new(store.clone(), state.clone(), &attr_map("2024-06-13"));
        linked.load().await;
        fixed.load().await;
        assert_eq!(linked.value(), 0);
        assert_eq!(fixed.value(), 0);

        state.set_selected_date(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
        linked.handle_date_change().await;
        fixed.handle_date_change().await;

        assert_eq!(linked.value(), 9);
        assert_eq!(fixed.value(), 0);
        assert!(!fixed.reacts_to_date_changes());
    }

    #[tokio::test]
    async fn test_errored_widget_recovers_on_date_change() {
        let (_db, store, state) = setup().await;
        let mut widget = CounterWidget::new(store.clone(), state.clone(), &attr_map("@date"));
        widget.load().await;

        // Force an error by breaking the table out from under it
        _db.run("DROP TABLE Habits", &[]).await.unwrap();
        widget.load().await;
        assert_eq!(widget.phase(), Phase::Error);

        _db.run(
            "CREATE TABLE Habits (habit TEXT, date TEXT, count INTEGER, UNIQUE(habit, date))",
            &[],
        )
        .await
        .unwrap();
        state.set_selected_date(NaiveDate::from_ymd_opt(2024, 6, 20).unwrap());
        widget.handle_date_change().await;
        assert_eq!(widget.phase(), Phase::Ready);
    }
}
