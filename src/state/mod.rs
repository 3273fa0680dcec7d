//! Shared selection state
//!
//! One `SelectionState` exists per plugin activation: the currently
//! selected date, the active navigation period, and the derived
//! start/end-of-period bounds. The derived pair is recomputed under the
//! same write lock as the mutation, before any notification goes out, so
//! no observer can ever see a date whose bounds have not caught up. Every
//! change broadcasts the complete new [`Snapshot`] over a channel; the
//! date-navigator UI and all `@date`-linked widgets subscribe to it.

pub mod period;
pub mod placeholders;

pub use period::{adjacent_date, period_id, period_label, period_range, Direction, Period};

use std::sync::{PoisonError, RwLock};

use chrono::{NaiveDate, Utc};
use tokio::sync::broadcast;

/// A consistent view of the selection state at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub selected_date: NaiveDate,
    pub period: Period,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl Snapshot {
    fn new(selected_date: NaiveDate, period: Period) -> Self {
        let (period_start, period_end) = period_range(selected_date, period);
        Self {
            selected_date,
            period,
            period_start,
            period_end,
        }
    }

    /// The identifier string for the selected period (`2024-W16`, ...)
    pub fn period_id(&self) -> String {
        period_id(self.selected_date, self.period)
    }
}

pub struct SelectionState {
    inner: RwLock<Snapshot>,
    tx: broadcast::Sender<Snapshot>,
}

impl SelectionState {
    /// State seeded with an explicit date and period.
    pub fn new(selected_date: NaiveDate, period: Period) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(Snapshot::new(selected_date, period)),
            tx,
        }
    }

    /// State seeded with today (UTC) and day navigation, the values a
    /// fresh plugin activation starts from.
    pub fn today() -> Self {
        Self::new(Utc::now().date_naive(), Period::Day)
    }

    pub fn snapshot(&self) -> Snapshot {
        *self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.snapshot().selected_date
    }

    pub fn period(&self) -> Period {
        self.snapshot().period
    }

    pub fn period_start_date(&self) -> NaiveDate {
        self.snapshot().period_start
    }

    pub fn period_end_date(&self) -> NaiveDate {
        self.snapshot().period_end
    }

    /// Subscribe to change notifications. Each event carries the full
    /// new snapshot, so late or slow receivers still see consistent
    /// values without re-reading shared state.
    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Set the selected date. Unchanged values are a no-op and emit
    /// nothing.
    pub fn set_selected_date(&self, date: NaiveDate) {
        self.mutate(|current| Snapshot::new(date, current.period));
    }

    /// Set the selected date from raw `YYYY-MM-DD` text. Malformed input
    /// falls back to today; the repair is logged so upstream bugs stay
    /// visible.
    pub fn set_selected_date_str(&self, raw: &str) {
        let date = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                tracing::warn!(input = raw, "malformed selected date, falling back to today");
                Utc::now().date_naive()
            }
        };
        self.set_selected_date(date);
    }

    /// Set the navigation period. Unchanged values are a no-op.
    pub fn set_period(&self, period: Period) {
        self.mutate(|current| Snapshot::new(current.selected_date, period));
    }

    /// Step the selected date to the adjacent period (date-navigator
    /// prev/next buttons).
    pub fn navigate(&self, direction: Direction) {
        self.mutate(|current| {
            Snapshot::new(
                adjacent_date(current.selected_date, current.period, direction),
                current.period,
            )
        });
    }

    /// Apply the selection state to raw block text (`@date`, `@periodId`
    /// and friends) before it is parsed.
    pub fn resolve_placeholders(&self, source: &str) -> String {
        placeholders::replace_placeholders(source, &self.snapshot())
    }

    /// The single write path: recompute the snapshot under the write
    /// lock, and broadcast before releasing it so events observe
    /// mutation order. Listeners on a lagging receiver miss events, not
    /// consistency.
    fn mutate(&self, next: impl FnOnce(&Snapshot) -> Snapshot) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let updated = next(&guard);
        if *guard == updated {
            return;
        }
        *guard = updated;
        let _ = self.tx.send(updated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_bounds_recomputed_before_notification() {
        let state = SelectionState::new(date("2024-06-01"), Period::Week);
        let mut rx = state.subscribe();

        state.set_selected_date(date("2024-06-13"));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.selected_date, date("2024-06-13"));
        assert_eq!(event.period_start, date("2024-06-10"));
        assert_eq!(event.period_end, date("2024-06-16"));
        // and the state itself already agrees
        assert_eq!(state.period_start_date(), date("2024-06-10"));
    }

    #[test]
    fn test_setting_same_date_emits_nothing() {
        let state = SelectionState::new(date("2024-06-13"), Period::Day);
        let mut rx = state.subscribe();

        state.set_selected_date(date("2024-06-13"));
        assert!(rx.try_recv().is_err());

        state.set_period(Period::Day);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_period_change_updates_bounds() {
        let state = SelectionState::new(date("2024-06-13"), Period::Day);
        assert_eq!(state.period_start_date(), date("2024-06-13"));

        state.set_period(Period::Month);
        assert_eq!(state.period_start_date(), date("2024-06-01"));
        assert_eq!(state.period_end_date(), date("2024-06-30"));
    }

    #[test]
    fn test_malformed_date_repairs_to_today() {
        let state = SelectionState::new(date("2020-01-01"), Period::Day);
        state.set_selected_date_str("not-a-date");
        assert_eq!(state.selected_date(), Utc::now().date_naive());
    }

    #[test]
    fn test_navigation_steps_by_period() {
        let state = SelectionState::new(date("2024-06-13"), Period::Week);
        state.navigate(Direction::Next);
        assert_eq!(state.selected_date(), date("2024-06-20"));

        state.set_period(Period::Month);
        state.navigate(Direction::Previous);
        assert_eq!(state.selected_date(), date("2024-05-01"));
    }

    #[test]
    fn test_every_mutation_keeps_the_invariant() {
        let state = SelectionState::new(date("2024-06-13"), Period::Day);
        for period in [Period::Week, Period::Month, Period::Quarter, Period::Year] {
            state.set_period(period);
            let snap = state.snapshot();
            assert!(snap.period_start <= snap.selected_date);
            assert!(snap.selected_date <= snap.period_end);
        }
    }
}
