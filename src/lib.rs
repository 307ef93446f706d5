//! persistent-atom - a reactive single value kept in sync with storage
//!
//! Hydrate, validate and migrate on startup; persist every change, immediately
//! or debounced; back up and replace corrupt records.

pub mod atom;
pub mod cli;
pub mod codec;
pub mod lifecycle;
pub mod observability;
pub mod schema;
pub mod storage;

pub use atom::{
    AtomConfig, AtomError, AtomResult, AtomSettings, AtomValue, HydrationPhase, PersistentAtom,
    SubscriptionId, WriteRetryPolicy,
};
pub use lifecycle::{ShutdownFlush, ShutdownReport};
pub use observability::{AtomMetrics, MetricsSnapshot};
pub use storage::{FileAdapter, MemoryAdapter, StorageAdapter};
