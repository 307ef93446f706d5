//! Guarded mutator
//!
//! The only path from callers to the atom's value after hydration:
//!
//! 1. Not hydrated: `NotReady`
//! 2. Schema rejects: `Validation`; otherwise its output replaces `next`
//! 3. Equal to current: silent no-op
//! 4. Otherwise commit, notify subscribers, schedule a write

use std::sync::Arc;

use crate::observability::{log_event_with_fields, Event};

use super::errors::{AtomError, AtomResult};
use super::{AtomValue, Inner};

/// Whether the write scheduler observes a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CommitMode {
    Observed,
    /// The caller persists the value itself (`set_and_flush`)
    Silent,
}

impl<T: AtomValue> Inner<T> {
    /// Returns false when the equality check suppressed the change
    pub(super) fn guarded_set(self: &Arc<Self>, next: T, mode: CommitMode) -> AtomResult<bool> {
        if !self.lock_state().is_hydrated() {
            return Err(self.not_ready());
        }

        // The validator's output is what gets committed, same as on hydrate
        let next = match &self.schema {
            Some(schema) => {
                let raw = serde_json::to_value(&next).map_err(|e| AtomError::Encode {
                    key: self.key.clone(),
                    message: e.to_string(),
                })?;
                match schema.validate(&raw) {
                    Ok(value) => value,
                    Err(source) => {
                        self.metrics.increment_sets_rejected();
                        let error_text = source.to_string();
                        log_event_with_fields(
                            Event::SetRejected,
                            &[("error", &error_text), ("key", &self.key)],
                        );
                        return Err(AtomError::Validation {
                            key: self.key.clone(),
                            source,
                        });
                    }
                }
            }
            None => next,
        };

        let (seq, value) = {
            let mut state = self.lock_state();
            if let Some(is_equal) = &self.is_equal {
                if is_equal(&state.value, &next) {
                    self.metrics.increment_sets_suppressed();
                    return Ok(false);
                }
            }
            let seq = state.commit(next);
            (seq, state.value.clone())
        };

        self.listeners.notify(&value);
        if mode == CommitMode::Observed && self.scheduler.is_armed() {
            self.observe(seq, value);
        }
        Ok(true)
    }

    /// Unguarded commit used by recovery. Notifies subscribers, never schedules.
    pub(super) fn commit_direct(&self, value: T) -> u64 {
        let (seq, value) = {
            let mut state = self.lock_state();
            let seq = state.commit(value);
            (seq, state.value.clone())
        };
        self.listeners.notify(&value);
        seq
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::atom::{AtomConfig, PersistentAtom};
    use crate::codec::encode;
    use crate::schema::{FieldDef, FnValidator, ShapeValidator, ValidationError};
    use crate::storage::MemoryAdapter;

    use super::*;

    fn name_schema() -> ShapeValidator<HashMap<String, String>> {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), FieldDef::required_string());
        ShapeValidator::object(fields)
    }

    #[tokio::test]
    async fn test_schema_rejection_surfaces() {
        let storage = Arc::new(MemoryAdapter::new());
        let atom = PersistentAtom::new(
            AtomConfig::new("user", storage.clone(), HashMap::from([("name".to_string(), "a".to_string())]))
                .schema(name_schema()),
        );
        atom.ready().await.unwrap();

        let err = atom
            .set(HashMap::from([("nickname".to_string(), "b".to_string())]))
            .unwrap_err();
        assert_eq!(err.code(), "ATOM_VALIDATION_FAILED");
        assert_eq!(atom.get()["name"], "a");
        assert_eq!(atom.metrics().sets_rejected, 1);

        tokio::task::yield_now().await;
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_silent_commit_skips_scheduler() {
        let storage = Arc::new(MemoryAdapter::new());
        let atom = PersistentAtom::new(AtomConfig::new("n", storage.clone(), 0u32));
        atom.ready().await.unwrap();

        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        atom.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(atom.inner.guarded_set(3, CommitMode::Silent).unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(atom.get(), 3);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(storage.write_count(), 0);
    }

    fn lowercase_schema() -> FnValidator<impl Fn(&serde_json::Value) -> Result<String, ValidationError> + Send + Sync> {
        FnValidator::new(|raw: &serde_json::Value| {
            raw.as_str()
                .map(str::to_lowercase)
                .ok_or_else(|| ValidationError::custom("not a string"))
        })
    }

    #[tokio::test]
    async fn test_set_commits_validator_output() {
        let storage = Arc::new(MemoryAdapter::new().with_entry("tag", encode(&"HYD", 1).unwrap()));
        let atom = PersistentAtom::new(
            AtomConfig::new("tag", storage.clone(), String::new()).schema(lowercase_schema()),
        );
        atom.ready().await.unwrap();
        assert_eq!(atom.get(), "hyd");

        atom.set_and_flush("ABC".to_string()).await.unwrap();
        assert_eq!(atom.get(), "abc");
        assert_eq!(storage.get("tag").unwrap(), encode(&"abc", 1).unwrap());
    }

    #[tokio::test]
    async fn test_equality_sees_validator_output() {
        let storage = Arc::new(MemoryAdapter::new().with_entry("tag", encode(&"abc", 1).unwrap()));
        let atom = PersistentAtom::new(
            AtomConfig::new("tag", storage.clone(), String::new())
                .schema(lowercase_schema())
                .dedupe_equal(),
        );
        atom.ready().await.unwrap();

        assert!(!atom.inner.guarded_set("ABC".to_string(), CommitMode::Observed).unwrap());
        assert_eq!(atom.metrics().sets_suppressed, 1);
    }
}
