//! Atom configuration
//!
//! `AtomConfig` is the typed, construction-time builder. `AtomSettings` is the
//! serde-loadable subset (data directory, version, debounce) used by hosts that
//! keep their settings in a JSON file.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::codec::{MigrationFailure, MigrationRegistry};
use crate::observability::AtomMetrics;
use crate::schema::Validator;
use crate::storage::{FileAdapter, StorageAdapter};

use super::errors::AtomError;

/// Error a fallback producer may return
pub type FallbackFailure = Box<dyn std::error::Error + Send + Sync>;

pub(crate) type FallbackFn<T> =
    Arc<dyn Fn(AtomError) -> BoxFuture<'static, Result<T, FallbackFailure>> + Send + Sync>;

pub(crate) type EqualityFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Target version used when none is configured
pub const DEFAULT_VERSION: u32 = 1;

/// Retry policy for automatic (subscription-triggered) writes.
///
/// `flush` never retries; its caller sees the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRetryPolicy {
    /// Total attempts including the first; 1 disables retries
    pub max_attempts: u32,
    /// Delay before the second attempt, doubled after each failure
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for WriteRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(25),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl WriteRetryPolicy {
    /// Log and drop on the first failure
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based), with up to 50% jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let base = self
            .initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff);
        let jitter_ms = (base.as_millis() as u64) / 2;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Construction-time options for a [`PersistentAtom`](super::PersistentAtom)
pub struct AtomConfig<T> {
    pub(crate) key: String,
    pub(crate) storage: Arc<dyn StorageAdapter>,
    pub(crate) initial: T,
    pub(crate) debounce: Option<Duration>,
    pub(crate) is_equal: Option<EqualityFn<T>>,
    pub(crate) schema: Option<Arc<dyn Validator<T>>>,
    pub(crate) version: u32,
    pub(crate) migrations: MigrationRegistry,
    pub(crate) on_corruption: Option<FallbackFn<T>>,
    pub(crate) retry: WriteRetryPolicy,
    pub(crate) metrics: Arc<AtomMetrics>,
}

impl<T> AtomConfig<T> {
    /// `key` names the record in `storage`; `initial` is the value until
    /// hydration resolves, and forever if it fails.
    pub fn new(key: impl Into<String>, storage: Arc<dyn StorageAdapter>, initial: T) -> Self {
        Self {
            key: key.into(),
            storage,
            initial,
            debounce: None,
            is_equal: None,
            schema: None,
            version: DEFAULT_VERSION,
            migrations: MigrationRegistry::new(),
            on_corruption: None,
            retry: WriteRetryPolicy::default(),
            metrics: Arc::new(AtomMetrics::new()),
        }
    }

    /// Batch writes: persist only after `window` passes with no new change
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }

    pub fn debounce_ms(self, millis: u64) -> Self {
        self.debounce(Duration::from_millis(millis))
    }

    /// Skip a `set` when `eq(current, next)` holds
    pub fn is_equal<F>(mut self, eq: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.is_equal = Some(Arc::new(eq));
        self
    }

    /// Validate hydrated values and every `set`
    pub fn schema<V>(mut self, validator: V) -> Self
    where
        V: Validator<T> + 'static,
    {
        self.schema = Some(Arc::new(validator));
        self
    }

    /// Target data version written into every envelope
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Register the migration producing `version`
    pub fn migration<F>(mut self, version: u32, step: F) -> Self
    where
        F: Fn(serde_json::Value) -> Result<serde_json::Value, MigrationFailure>
            + Send
            + Sync
            + 'static,
    {
        self.migrations.register(version, step);
        self
    }

    /// Replace the whole migration registry
    pub fn migrations(mut self, migrations: MigrationRegistry) -> Self {
        self.migrations = migrations;
        self
    }

    pub fn retry_policy(mut self, retry: WriteRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Share a metrics registry between atoms
    pub fn metrics(mut self, metrics: Arc<AtomMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Apply file-loaded settings (version and debounce)
    pub fn with_settings(mut self, settings: &AtomSettings) -> Self {
        self.version = settings.version;
        self.debounce = settings.debounce_ms.map(Duration::from_millis);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T: Send + 'static> AtomConfig<T> {
    /// [`AtomConfig::is_equal`] using `PartialEq`
    pub fn dedupe_equal(self) -> Self
    where
        T: PartialEq,
    {
        self.is_equal(|a: &T, b: &T| a == b)
    }

    /// Fallback producer for unrecoverable hydration errors
    pub fn on_corruption<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&AtomError) -> Result<T, FallbackFailure> + Send + Sync + 'static,
    {
        self.on_corruption = Some(Arc::new(
            move |err: AtomError| -> BoxFuture<'static, Result<T, FallbackFailure>> {
                let produced = fallback(&err);
                Box::pin(async move { produced })
            },
        ));
        self
    }

    /// Asynchronous fallback producer
    pub fn on_corruption_async<F, Fut>(mut self, fallback: F) -> Self
    where
        F: Fn(AtomError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FallbackFailure>> + Send + 'static,
    {
        self.on_corruption = Some(Arc::new(
            move |err: AtomError| -> BoxFuture<'static, Result<T, FallbackFailure>> {
                Box::pin(fallback(err))
            },
        ));
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for AtomConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomConfig")
            .field("key", &self.key)
            .field("storage", &self.storage.name())
            .field("initial", &self.initial)
            .field("debounce", &self.debounce)
            .field("is_equal", &self.is_equal.is_some())
            .field("schema", &self.schema.is_some())
            .field("version", &self.version)
            .field("migrations", &self.migrations)
            .field("on_corruption", &self.on_corruption.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

/// Settings file structure
///
/// ```json
/// { "data_dir": "./state", "version": 2, "debounce_ms": 250 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomSettings {
    /// Directory holding one record file per key (required)
    pub data_dir: PathBuf,

    /// Target data version (optional, default 1)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Debounce window in milliseconds (optional, default immediate writes)
    #[serde(default)]
    pub debounce_ms: Option<u64>,
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

impl AtomSettings {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            version: DEFAULT_VERSION,
            debounce_ms: None,
        }
    }

    /// Parse settings from JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// File adapter rooted at `data_dir`
    pub fn file_adapter(&self) -> FileAdapter {
        FileAdapter::new(self.data_dir.clone())
    }
}
