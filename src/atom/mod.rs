//! Persistent atom
//!
//! A single in-memory value kept in sync with a storage backend.
//!
//! # Lifecycle
//!
//! 1. `PersistentAtom::new` stores the initial value and spawns hydration
//! 2. Hydration reads, decodes, migrates and validates the stored record
//! 3. On failure, recovery backs up the corrupt record and asks the fallback
//!    producer for a replacement
//! 4. Once hydrated, every observed `set` is persisted by the write scheduler
//!
//! Until `ready()` resolves, `set` and `flush` return `AtomError::NotReady`
//! and nothing is written. An atom that failed to hydrate stays at its
//! initial value and never writes, so a corrupt record is left for a human.
//!
//! # Usage
//!
//! ```ignore
//! let storage = Arc::new(FileAdapter::new("./state"));
//! let atom = PersistentAtom::new(
//!     AtomConfig::new("prefs", storage, Prefs::default())
//!         .version(2)
//!         .migration(2, upgrade_prefs)
//!         .debounce_ms(250),
//! );
//! atom.ready().await?;
//! atom.set(Prefs { theme: "dark".into(), ..atom.get() })?;
//! atom.flush().await?;
//! ```

mod config;
mod errors;
mod hydration;
mod listeners;
mod mutator;
mod recovery;
mod scheduler;
mod state;

pub use config::{AtomConfig, AtomSettings, FallbackFailure, WriteRetryPolicy, DEFAULT_VERSION};
pub use errors::{AtomError, AtomResult};
pub use listeners::SubscriptionId;
pub use state::HydrationPhase;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::codec::MigrationRegistry;
use crate::observability::{AtomMetrics, MetricsSnapshot};
use crate::schema::Validator;
use crate::storage::StorageAdapter;

use config::{EqualityFn, FallbackFn};
use listeners::Listeners;
use mutator::CommitMode;
use scheduler::WriteScheduler;
use state::{AtomState, Readiness};

/// Bounds every atom value satisfies
pub trait AtomValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> AtomValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Shared core behind every clone of a [`PersistentAtom`]
pub(crate) struct Inner<T> {
    key: String,
    storage: Arc<dyn StorageAdapter>,
    version: u32,
    migrations: MigrationRegistry,
    schema: Option<Arc<dyn Validator<T>>>,
    is_equal: Option<EqualityFn<T>>,
    on_corruption: Option<FallbackFn<T>>,
    metrics: Arc<AtomMetrics>,
    state: Mutex<AtomState<T>>,
    ready_tx: watch::Sender<Readiness>,
    listeners: Listeners<T>,
    scheduler: WriteScheduler,
}

impl<T> Inner<T> {
    /// Never held across an await
    fn lock_state(&self) -> MutexGuard<'_, AtomState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: HydrationPhase) {
        self.lock_state().phase = phase;
    }

    fn current_seq(&self) -> u64 {
        self.lock_state().seq
    }

    fn not_ready(&self) -> AtomError {
        AtomError::NotReady {
            key: self.key.clone(),
        }
    }
}

/// Reactive value persisted through a [`StorageAdapter`].
///
/// Cloning is cheap; clones share the same value, subscribers and scheduler.
pub struct PersistentAtom<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for PersistentAtom<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: AtomValue> PersistentAtom<T> {
    /// Create the atom and start hydration in the background.
    ///
    /// Never fails: hydration errors surface through [`PersistentAtom::ready`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(config: AtomConfig<T>) -> Self {
        let AtomConfig {
            key,
            storage,
            initial,
            debounce,
            is_equal,
            schema,
            version,
            migrations,
            on_corruption,
            retry,
            metrics,
        } = config;

        let (ready_tx, _) = watch::channel(Readiness::Pending);
        let inner = Arc::new(Inner {
            key,
            storage,
            version,
            migrations,
            schema,
            is_equal,
            on_corruption,
            metrics,
            state: Mutex::new(AtomState::new(initial)),
            ready_tx,
            listeners: Listeners::new(),
            scheduler: WriteScheduler::new(debounce, retry),
        });

        tokio::spawn(Arc::clone(&inner).hydrate());
        Self { inner }
    }

    /// Storage key
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Current value. The initial value until hydration commits.
    pub fn get(&self) -> T {
        self.inner.lock_state().value.clone()
    }

    /// Replace the value through the guard.
    ///
    /// Errors: `NotReady` before hydration (or after it failed), `Validation`
    /// when the schema rejects `next`. An equal value is a silent no-op.
    pub fn set(&self, next: T) -> AtomResult<()> {
        self.inner.guarded_set(next, CommitMode::Observed).map(|_| ())
    }

    /// Read-modify-set through the same guard as [`PersistentAtom::set`]
    pub fn update<F>(&self, f: F) -> AtomResult<()>
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get();
        self.set(f(&current))
    }

    /// Call `listener` after every committed change, including the hydrated value
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.listeners.add(listener)
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Resolves once hydration completes; rejects with the triggering error
    /// when hydration failed and no fallback recovered it.
    pub async fn ready(&self) -> AtomResult<()> {
        let mut rx = self.inner.ready_tx.subscribe();
        let readiness = rx
            .wait_for(Readiness::is_settled)
            .await
            .map(|r| (*r).clone())
            .map_err(|_| self.inner.not_ready())?;

        match readiness {
            Readiness::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }

    pub fn is_hydrated(&self) -> bool {
        self.inner.lock_state().is_hydrated()
    }

    pub fn phase(&self) -> HydrationPhase {
        self.inner.lock_state().phase
    }

    /// Counters for this atom (shared if the registry was shared)
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Cancel any scheduled write and persist the current value now.
    ///
    /// Write errors propagate; there is no retry.
    pub async fn flush(&self) -> AtomResult<()> {
        self.inner.flush().await
    }

    /// Set `next` and persist it before returning, bypassing debounce
    pub async fn set_and_flush(&self, next: T) -> AtomResult<()> {
        self.inner.guarded_set(next, CommitMode::Silent)?;
        self.inner.flush().await
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentAtom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("PersistentAtom")
            .field("key", &self.inner.key)
            .field("storage", &self.inner.storage.name())
            .field("phase", &state.phase)
            .field("value", &state.value)
            .finish()
    }
}
