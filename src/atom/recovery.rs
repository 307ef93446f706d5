//! Corruption recovery
//!
//! Entered once, from any hydration failure. Two independent best-effort steps:
//!
//! 1. Backup: when the adapter reports a location for the key and supports
//!    backups, copy the record aside. Failure is logged, never blocking.
//! 2. Fallback: ask the producer for a replacement value. On success, commit it,
//!    write it through immediately and become hydrated. On failure, or with no
//!    producer, fail with the ORIGINAL error.

use crate::observability::{log_event_with_fields, Event};

use super::errors::AtomError;
use super::state::{HydrationPhase, Readiness};
use super::{AtomValue, Inner};

impl<T: AtomValue> Inner<T> {
    pub(super) async fn recover(&self, err: AtomError) {
        self.set_phase(HydrationPhase::Recovering);
        self.metrics.increment_recoveries();
        let error_text = err.to_string();
        log_event_with_fields(
            Event::RecoveryStart,
            &[("code", err.code()), ("error", &error_text), ("key", &self.key)],
        );

        self.backup_record().await;

        let Some(fallback) = self.on_corruption.clone() else {
            self.fail(err);
            return;
        };

        match fallback(err.clone()).await {
            Ok(value) => {
                let seq = self.commit_direct(value.clone());
                log_event_with_fields(Event::FallbackApplied, &[("key", &self.key)]);

                // The value stays committed even if this write fails
                if let Err(write_err) = self.write_through(seq, &value, true).await {
                    self.metrics.increment_writes_failed();
                    let write_text = write_err.to_string();
                    log_event_with_fields(
                        Event::WriteFailed,
                        &[("code", write_err.code()), ("error", &write_text), ("key", &self.key)],
                    );
                }

                self.finish_hydration(None);
                log_event_with_fields(
                    Event::HydrationComplete,
                    &[("key", &self.key), ("source", "fallback")],
                );
            }
            Err(cause) => {
                let fallback_err = AtomError::Fallback {
                    key: self.key.clone(),
                    message: cause.to_string(),
                };
                let fallback_text = fallback_err.to_string();
                log_event_with_fields(
                    Event::FallbackFailed,
                    &[
                        ("code", fallback_err.code()),
                        ("error", &fallback_text),
                        ("key", &self.key),
                        ("original", err.code()),
                    ],
                );
                self.fail(err);
            }
        }
    }

    async fn backup_record(&self) {
        if !self.storage.supports_backup() {
            return;
        }
        let Some(location) = self.storage.location(&self.key) else {
            return;
        };

        match self.storage.create_backup(&location).await {
            Ok(backup) => {
                self.metrics.increment_backups_created();
                log_event_with_fields(
                    Event::BackupCreated,
                    &[("backup", &backup), ("key", &self.key), ("location", &location)],
                );
            }
            Err(source) => {
                self.metrics.increment_backups_failed();
                let err = AtomError::Backup {
                    location: location.clone(),
                    source,
                };
                let error_text = err.to_string();
                log_event_with_fields(
                    Event::BackupFailed,
                    &[("code", err.code()), ("error", &error_text), ("key", &self.key)],
                );
            }
        }
    }

    /// Terminal failure. The value stays at its initial default and the
    /// scheduler is never armed.
    fn fail(&self, err: AtomError) {
        self.set_phase(HydrationPhase::Failed);
        self.metrics.increment_hydration_failures();
        let error_text = err.to_string();
        log_event_with_fields(
            Event::HydrationFailed,
            &[("code", err.code()), ("error", &error_text), ("key", &self.key)],
        );
        self.ready_tx.send_replace(Readiness::Failed(err));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::atom::{AtomConfig, HydrationPhase, PersistentAtom};
    use crate::storage::MemoryAdapter;

    #[tokio::test]
    async fn test_backup_failure_does_not_block_fallback() {
        let storage = Arc::new(MemoryAdapter::new().with_backups().with_entry("n", "{not json"));
        storage.fail_backups(true);
        let atom = PersistentAtom::new(AtomConfig::new("n", storage.clone(), 0u32).on_corruption(|_| Ok(1)));

        atom.ready().await.unwrap();
        assert_eq!(atom.get(), 1);
        assert!(storage.backups().is_empty());
        let metrics = atom.metrics();
        assert_eq!(metrics.backups_failed, 1);
        assert_eq!(metrics.recoveries, 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_keeps_original_error() {
        let storage = Arc::new(MemoryAdapter::new().with_entry("n", "{not json"));
        let atom = PersistentAtom::new(
            AtomConfig::new("n", storage.clone(), 0u32).on_corruption(|_| Err("no default".into())),
        );

        let err = atom.ready().await.unwrap_err();
        assert_eq!(err.code(), "ATOM_DECODE_FAILED");
        assert_eq!(atom.phase(), HydrationPhase::Failed);
        assert_eq!(atom.get(), 0);
        assert_eq!(storage.write_count(), 0);
        assert_eq!(atom.metrics().hydration_failures, 1);
    }

    #[tokio::test]
    async fn test_async_fallback() {
        let storage = Arc::new(MemoryAdapter::new().with_entry("n", r#"{"version":1,"data":"x"}"#));
        let atom = PersistentAtom::new(AtomConfig::new("n", storage.clone(), 0u32).on_corruption_async(
            |err| async move {
                tokio::task::yield_now().await;
                assert_eq!(err.code(), "ATOM_VALIDATION_FAILED");
                Ok(42)
            },
        ));

        atom.ready().await.unwrap();
        assert_eq!(atom.get(), 42);
        assert_eq!(storage.get("n").unwrap(), r#"{"version":1,"data":42}"#);
    }

    #[tokio::test]
    async fn test_fallback_write_failure_still_hydrates() {
        let storage = Arc::new(MemoryAdapter::new().with_entry("n", "{not json"));
        storage.fail_writes(true);
        let atom = PersistentAtom::new(AtomConfig::new("n", storage.clone(), 0u32).on_corruption(|_| Ok(5)));

        atom.ready().await.unwrap();
        assert_eq!(atom.get(), 5);
        assert_eq!(storage.get("n").unwrap(), "{not json");
        assert_eq!(atom.metrics().writes_failed, 1);
    }
}
