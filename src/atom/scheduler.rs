//! Write scheduler
//!
//! Persists observed changes, either immediately or after a debounce window.
//!
//! # Ordering
//!
//! Every committed change carries a sequence number. Writes are serialized
//! through a gate and a write older than the last persisted sequence is
//! skipped, so the backend never goes back to an older value even when
//! immediate-mode writes finish out of order.
//!
//! # Failure
//!
//! Automatic writes retry with backoff, are abandoned once a newer change
//! supersedes them, and are finally logged and dropped. The in-memory value is
//! never rolled back. `flush` writes once and returns the error.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::codec::encode;
use crate::observability::{log_event_with_fields, Event};

use super::config::WriteRetryPolicy;
use super::errors::{AtomError, AtomResult};
use super::{AtomValue, Inner};

/// Debounced write waiting for its window to close
struct PendingWrite {
    seq: u64,
    handle: JoinHandle<()>,
}

pub(crate) struct WriteScheduler {
    debounce: Option<Duration>,
    retry: WriteRetryPolicy,
    /// Set once hydration completes; never cleared
    armed: AtomicBool,
    pending: Mutex<Option<PendingWrite>>,
    gate: tokio::sync::Mutex<()>,
    /// Highest sequence known to be in storage
    persisted: AtomicU64,
}

impl WriteScheduler {
    pub(crate) fn new(debounce: Option<Duration>, retry: WriteRetryPolicy) -> Self {
        Self {
            debounce,
            retry,
            armed: AtomicBool::new(false),
            pending: Mutex::new(None),
            gate: tokio::sync::Mutex::new(()),
            persisted: AtomicU64::new(0),
        }
    }

    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_persisted(&self, seq: u64) {
        self.persisted.fetch_max(seq, Ordering::SeqCst);
    }

    fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::SeqCst)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingWrite>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Abort the debounced write, if one is still waiting
    fn cancel_pending(&self) -> bool {
        match self.lock_pending().take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Called by a debounced task when its window closes. False means a newer
    /// change or a flush replaced it.
    fn claim(&self, seq: u64) -> bool {
        let mut pending = self.lock_pending();
        match pending.as_ref() {
            Some(p) if p.seq == seq => {
                pending.take();
                true
            }
            _ => false,
        }
    }
}

impl<T: AtomValue> Inner<T> {
    /// Schedule persistence of the change committed as `seq`
    pub(super) fn observe(self: &Arc<Self>, seq: u64, value: T) {
        let Some(window) = self.scheduler.debounce else {
            tokio::spawn(Arc::clone(self).auto_write(seq, value));
            return;
        };

        let mut pending = self.scheduler.lock_pending();
        if let Some(previous) = pending.take() {
            // Commits can reach here out of order; the newer one stays pending
            if previous.seq > seq {
                *pending = Some(previous);
                self.metrics.increment_writes_superseded();
                return;
            }
            previous.handle.abort();
        }
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if inner.scheduler.claim(seq) {
                inner.auto_write(seq, value).await;
            }
        });
        *pending = Some(PendingWrite { seq, handle });
    }

    /// Subscription-triggered write. Never returns an error.
    async fn auto_write(self: Arc<Self>, seq: u64, value: T) {
        let seq_text = seq.to_string();
        let policy = self.scheduler.retry;
        let mut attempt: u32 = 1;

        loop {
            let err = match self.write_through(seq, &value, false).await {
                Ok(()) => return,
                Err(err) => err,
            };

            self.metrics.increment_writes_failed();
            let attempt_text = attempt.to_string();
            let error_text = err.to_string();
            log_event_with_fields(
                Event::WriteFailed,
                &[
                    ("attempt", &attempt_text),
                    ("code", err.code()),
                    ("error", &error_text),
                    ("key", &self.key),
                    ("seq", &seq_text),
                ],
            );

            // Encoding fails the same way every time
            if matches!(err, AtomError::Encode { .. }) || attempt >= policy.max_attempts {
                log_event_with_fields(
                    Event::WriteDropped,
                    &[("attempt", &attempt_text), ("key", &self.key), ("seq", &seq_text)],
                );
                return;
            }

            let delay = policy.backoff(attempt);
            let delay_text = delay.as_millis().to_string();
            log_event_with_fields(
                Event::WriteRetry,
                &[
                    ("attempt", &attempt_text),
                    ("delay_ms", &delay_text),
                    ("key", &self.key),
                    ("seq", &seq_text),
                ],
            );
            self.metrics.increment_writes_retried();
            tokio::time::sleep(delay).await;

            if self.current_seq() > seq {
                self.metrics.increment_writes_superseded();
                return;
            }
            attempt += 1;
        }
    }

    /// Encode and write `value` unless a newer sequence is already persisted.
    ///
    /// `force` also rewrites the sequence that is already persisted.
    pub(super) async fn write_through(&self, seq: u64, value: &T, force: bool) -> AtomResult<()> {
        let raw = encode(value, self.version).map_err(|e| AtomError::from_codec(&self.key, e))?;

        let _gate = self.scheduler.gate.lock().await;
        let persisted = self.scheduler.persisted();
        let stale = if force { seq < persisted } else { seq <= persisted };
        if stale {
            self.metrics.increment_writes_superseded();
            return Ok(());
        }

        self.storage
            .set_item(&self.key, raw)
            .await
            .map_err(|source| AtomError::Write {
                key: self.key.clone(),
                source,
            })?;

        self.scheduler.mark_persisted(seq);
        self.metrics.increment_writes_succeeded();
        let seq_text = seq.to_string();
        log_event_with_fields(
            Event::WriteComplete,
            &[("key", &self.key), ("seq", &seq_text)],
        );
        Ok(())
    }

    /// Cancel any debounced write and persist the current value
    pub(super) async fn flush(&self) -> AtomResult<()> {
        let (seq, value) = {
            let state = self.lock_state();
            if !state.is_hydrated() {
                return Err(self.not_ready());
            }
            (state.seq, state.value.clone())
        };
        self.scheduler.cancel_pending();
        self.write_through(seq, &value, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_only_matching_sequence() {
        let scheduler = WriteScheduler::new(Some(Duration::from_millis(10)), WriteRetryPolicy::none());
        let handle = tokio::spawn(async {});
        *scheduler.lock_pending() = Some(PendingWrite { seq: 4, handle });

        assert!(!scheduler.claim(3));
        assert!(scheduler.claim(4));
        assert!(!scheduler.claim(4));
    }

    #[tokio::test]
    async fn test_cancel_pending() {
        let scheduler = WriteScheduler::new(Some(Duration::from_millis(10)), WriteRetryPolicy::none());
        assert!(!scheduler.cancel_pending());

        let handle = tokio::spawn(tokio::time::sleep(Duration::from_secs(60)));
        *scheduler.lock_pending() = Some(PendingWrite { seq: 1, handle });
        assert!(scheduler.cancel_pending());
        assert!(scheduler.lock_pending().is_none());
    }

    #[tokio::test]
    async fn test_out_of_order_observe_keeps_newest_pending() {
        use crate::atom::{AtomConfig, PersistentAtom};
        use crate::storage::MemoryAdapter;

        let storage = Arc::new(MemoryAdapter::new());
        let atom = PersistentAtom::new(AtomConfig::new("n", storage.clone(), 0u32).debounce_ms(20));
        atom.ready().await.unwrap();

        // Two callers commit 1 then 2, but the second reaches the scheduler first
        let first = atom.inner.lock_state().commit(1);
        let second = atom.inner.lock_state().commit(2);
        atom.inner.observe(second, 2);
        atom.inner.observe(first, 1);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(atom.get(), 2);
        assert_eq!(storage.writes_for("n"), vec![encode(&2u32, 1).unwrap()]);
        assert_eq!(atom.metrics().writes_superseded, 1);
    }

    #[tokio::test]
    async fn test_newer_observe_replaces_pending() {
        use crate::atom::{AtomConfig, PersistentAtom};
        use crate::storage::MemoryAdapter;

        let storage = Arc::new(MemoryAdapter::new());
        let atom = PersistentAtom::new(AtomConfig::new("n", storage.clone(), 0u32).debounce_ms(20));
        atom.ready().await.unwrap();

        let first = atom.inner.lock_state().commit(1);
        atom.inner.observe(first, 1);
        let second = atom.inner.lock_state().commit(2);
        atom.inner.observe(second, 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(storage.writes_for("n"), vec![encode(&2u32, 1).unwrap()]);
    }

    #[test]
    fn test_persisted_never_regresses() {
        let scheduler = WriteScheduler::new(None, WriteRetryPolicy::default());
        scheduler.mark_persisted(5);
        scheduler.mark_persisted(3);
        assert_eq!(scheduler.persisted(), 5);
        assert!(!scheduler.is_armed());
        scheduler.arm();
        assert!(scheduler.is_armed());
    }
}
