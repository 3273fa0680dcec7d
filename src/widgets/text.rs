//! Text field widget
//!
//! A free-text value for a keyed row (a daily note, a one-line journal).
//! Committing saves the raw input; there is no client-side validation of
//! the text itself.

use std::collections::HashMap;
use std::sync::Arc;

use super::store::WidgetStore;
use super::{Phase, WidgetAttrs, ERROR_TOKEN};
use crate::db::{DataAccess, Value};
use crate::state::SelectionState;

pub struct TextWidget<D> {
    attrs: Option<WidgetAttrs>,
    store: Arc<WidgetStore<D>>,
    state: Arc<SelectionState>,
    phase: Phase,
    text: String,
    error: Option<String>,
    load_seq: u64,
}

impl<D: DataAccess> TextWidget<D> {
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
            text: String::new(),
            error,
            load_seq: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn display(&self) -> String {
        if self.phase == Phase::Error {
            ERROR_TOKEN.to_string()
        } else {
            self.text.clone()
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

    /// Fetch the current text; a missing row reads as empty.
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
                self.text = value
                    .as_ref()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                self.phase = Phase::Ready;
                self.error = None;
            }
            Err(err) => {
                self.phase = Phase::Error;
                self.error = Some(err.to_string());
            }
        }
    }

    /// Save the committed input, reflecting it optimistically.
    pub async fn commit(&mut self, input: &str) {
        if !matches!(self.phase, Phase::Ready) {
            return;
        }
        let Some(attrs) = self.attrs.clone() else {
            return;
        };

        self.text = input.to_string();
        self.phase = Phase::Saving;

        let date = attrs.effective_date(&self.state);
        match self
            .store
            .upsert_value(&attrs, &date, Value::from(input))
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

    pub async fn handle_date_change(&mut self) {
        if self.reacts_to_date_changes() {
            self.load().await;
        }
    }
}
