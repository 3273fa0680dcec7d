//! Boolean switch widget
//!
//! A 0/1 toggle for a keyed row. The flip is reflected optimistically;
//! a failed save reverts it so the control never shows a state that was
//! not persisted.

use std::collections::HashMap;
use std::sync::Arc;

use super::store::WidgetStore;
use super::{Phase, WidgetAttrs, ERROR_TOKEN};
use crate::db::{DataAccess, Value};
use crate::state::SelectionState;

pub struct SwitchWidget<D> {
    attrs: Option<WidgetAttrs>,
    store: Arc<WidgetStore<D>>,
    state: Arc<SelectionState>,
    phase: Phase,
    on: bool,
    error: Option<String>,
    load_seq: u64,
}

impl<D: DataAccess> SwitchWidget<D> {
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
            on: false,
            error,
            load_seq: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn display(&self) -> String {
        if self.phase == Phase::Error {
            ERROR_TOKEN.to_string()
        } else if self.on {
            "on".to_string()
        } else {
            "off".to_string()
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.phase == Phase::Error
    }

    pub fn reacts_to_date_changes(&self) -> bool {
        self.attrs
            .as_ref()
            .is_some_and(WidgetAttrs::is_date_linked)
    }

    /// Fetch the current value; anything other than 1 reads as off.
    pub async fn load(&mut self) {
        let Some(attrs) = self.attrs.clone() else {
            return;
        };
        self.load_seq += 1;
        let seq = self.load_seq;
        self.phase = Phase::Loading;

        let date = attrs.effective_date(&self.state);
        let result = self.store.fetch_value(&attrs, &date).await;

        if seq != self.load_seq {
            return;
        }
        match result {
            Ok(value) => {
                self.on = value.as_ref().and_then(Value::as_i64) == Some(1);
                self.phase = Phase::Ready;
                self.error = None;
            }
            Err(err) => {
                self.phase = Phase::Error;
                self.error = Some(err.to_string());
            }
        }
    }

    /// Flip the switch: optimistic UI, persisted via upsert, reverted on
    /// failure.
    pub async fn toggle(&mut self) {
        if !matches!(self.phase, Phase::Ready) {
            return;
        }
        let Some(attrs) = self.attrs.clone() else {
            return;
        };

        let previous = self.on;
        self.on = !previous;
        self.phase = Phase::Saving;

        let date = attrs.effective_date(&self.state);
        match self
            .store
            .upsert_value(&attrs, &date, Value::from(self.on as i64))
            .await
        {
            Ok(()) => {
                self.phase = Phase::Ready;
                self.error = None;
            }
            Err(err) => {
                self.on = previous;
                self.phase = Phase::Error;
                self.error = Some(err.to_string());
            }
        }
    }

    pub async fn handle_date_change(&mut self) {
        if self.reacts_to_date_changes() {
            self.load().await;
        }
    }
}
