//! Shutdown flush registry

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture};

use crate::atom::{AtomError, AtomResult, AtomValue, PersistentAtom};
use crate::observability::{log_event_with_fields, Event};

/// Anything that can persist its current state on demand
pub trait Flushable: Send + Sync {
    fn key(&self) -> &str;
    fn flush(&self) -> BoxFuture<'_, AtomResult<()>>;
}

impl<T: AtomValue> Flushable for PersistentAtom<T> {
    fn key(&self) -> &str {
        PersistentAtom::key(self)
    }

    fn flush(&self) -> BoxFuture<'_, AtomResult<()>> {
        Box::pin(PersistentAtom::flush(self))
    }
}

/// Per-key outcome of a shutdown flush
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub flushed: Vec<String>,
    /// Atoms that never hydrated; there is nothing to persist
    pub skipped: Vec<String>,
    pub failed: Vec<(String, AtomError)>,
    pub timed_out: Vec<String>,
}

impl ShutdownReport {
    /// True when every hydrated atom reached storage
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.timed_out.is_empty()
    }

    fn record(&mut self, key: String, outcome: Option<AtomResult<()>>) {
        match outcome {
            Some(Ok(())) => self.flushed.push(key),
            Some(Err(AtomError::NotReady { .. })) => self.skipped.push(key),
            Some(Err(err)) => self.failed.push((key, err)),
            None => self.timed_out.push(key),
        }
    }
}

/// Host-owned list of atoms to flush at shutdown
#[derive(Default)]
pub struct ShutdownFlush {
    atoms: Mutex<Vec<Box<dyn Flushable>>>,
}

impl ShutdownFlush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clone of `atom`; the registry keeps it alive
    pub fn register_shutdown_flush<T: AtomValue>(&self, atom: &PersistentAtom<T>) {
        self.register(Box::new(atom.clone()));
    }

    pub fn register(&self, flushable: Box<dyn Flushable>) {
        self.lock().push(flushable);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Flush every registered atom concurrently and wait for all of them
    pub async fn flush_all(&self) -> ShutdownReport {
        self.run(None).await
    }

    /// Like [`ShutdownFlush::flush_all`], giving each atom at most `limit`
    pub async fn flush_all_within(&self, limit: Duration) -> ShutdownReport {
        self.run(Some(limit)).await
    }

    /// Wait for Ctrl+C, then flush everything within `limit`
    pub async fn flush_on_ctrl_c(&self, limit: Duration) -> std::io::Result<ShutdownReport> {
        tokio::signal::ctrl_c().await?;
        Ok(self.flush_all_within(limit).await)
    }

    async fn run(&self, limit: Option<Duration>) -> ShutdownReport {
        let atoms = std::mem::take(&mut *self.lock());
        let count = atoms.len().to_string();
        log_event_with_fields(Event::ShutdownFlushStart, &[("atoms", &count)]);

        let outcomes = join_all(atoms.iter().map(|atom| async move {
            let outcome = match limit {
                Some(limit) => tokio::time::timeout(limit, atom.flush()).await.ok(),
                None => Some(atom.flush().await),
            };
            (atom.key().to_string(), outcome)
        }))
        .await;

        let mut report = ShutdownReport::default();
        for (key, outcome) in outcomes {
            report.record(key, outcome);
        }

        for key in &report.timed_out {
            log_event_with_fields(Event::ShutdownFlushTimeout, &[("key", key)]);
        }
        let flushed = report.flushed.len().to_string();
        let failed = report.failed.len().to_string();
        let skipped = report.skipped.len().to_string();
        log_event_with_fields(
            Event::ShutdownFlushComplete,
            &[("failed", &failed), ("flushed", &flushed), ("skipped", &skipped)],
        );

        // Keep the registry usable for a later, second attempt
        self.lock().extend(atoms);
        report
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<dyn Flushable>>> {
        self.atoms.lock().unwrap_or_else(|e| e.into_inner())
    }
}
