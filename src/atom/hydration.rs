//! Hydration controller
//!
//! Runs once per atom, spawned by the constructor:
//!
//! ```text
//! Reading    -> no record   : Hydrated with the initial value
//! Decoding   -> codec error : Recovering
//! Validating -> rejected    : Recovering
//!            -> accepted    : Hydrated with the stored value
//! ```
//!
//! The scheduler is armed in the same critical section that marks the atom
//! hydrated, so no automatic write can precede readiness.

use std::sync::Arc;

use serde_json::Value;

use crate::codec::decode_record;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{TypedValidator, Validator};

use super::errors::{AtomError, AtomResult};
use super::state::{HydrationPhase, Readiness};
use super::{AtomValue, Inner};

impl<T: AtomValue> Inner<T> {
    pub(super) async fn hydrate(self: Arc<Self>) {
        self.metrics.increment_hydrations();
        let adapter = self.storage.name().to_string();
        log_event_with_fields(
            Event::HydrationStart,
            &[("adapter", &adapter), ("key", &self.key)],
        );

        match self.load().await {
            Ok(Some(value)) => {
                self.finish_hydration(Some(value));
                log_event_with_fields(
                    Event::HydrationComplete,
                    &[("key", &self.key), ("source", "storage")],
                );
            }
            Ok(None) => {
                self.finish_hydration(None);
                log_event_with_fields(Event::HydrationEmpty, &[("key", &self.key)]);
            }
            Err(err) => self.recover(err).await,
        }
    }

    /// Read, decode, migrate and validate. `None` when no record exists.
    async fn load(&self) -> AtomResult<Option<T>> {
        self.set_phase(HydrationPhase::Reading);
        let raw = self
            .storage
            .get_item(&self.key)
            .await
            .map_err(|source| AtomError::Read {
                key: self.key.clone(),
                source,
            })?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        self.set_phase(HydrationPhase::Decoding);
        let decoded = decode_record(&raw, self.version, &self.migrations)
            .map_err(|e| AtomError::from_codec(&self.key, e))?;
        if decoded.is_ahead() {
            let stored = decoded.stored_version.to_string();
            let target = decoded.target_version.to_string();
            log_event_with_fields(
                Event::RecordVersionAhead,
                &[
                    ("key", &self.key),
                    ("stored_version", &stored),
                    ("target_version", &target),
                ],
            );
        }

        self.set_phase(HydrationPhase::Validating);
        self.validate(&decoded.payload).map(Some)
    }

    /// Configured schema, else plain typed deserialization
    fn validate(&self, raw: &Value) -> AtomResult<T> {
        let result = match &self.schema {
            Some(schema) => schema.validate(raw),
            None => TypedValidator::<T>::new().validate(raw),
        };
        result.map_err(|source| AtomError::Validation {
            key: self.key.clone(),
            source,
        })
    }

    /// Commit `loaded` (already in storage), mark hydrated, arm the scheduler
    /// and resolve readiness.
    pub(super) fn finish_hydration(&self, loaded: Option<T>) {
        let committed = {
            let mut state = self.lock_state();
            let committed = loaded.map(|value| {
                let seq = state.commit(value);
                self.scheduler.mark_persisted(seq);
                state.value.clone()
            });
            state.phase = HydrationPhase::Hydrated;
            self.scheduler.arm();
            committed
        };

        if let Some(value) = &committed {
            self.listeners.notify(value);
        }
        self.ready_tx.send_replace(Readiness::Ready);
    }
}
