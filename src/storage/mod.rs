//! Storage adapters
//!
//! The engine only ever talks to a [`StorageAdapter`]: asynchronous get/set of
//! a string by key, plus an optional physical location and backup capability
//! used during corruption recovery.
//!
//! Two adapters are bundled:
//! - [`FileAdapter`]: one file per key, atomic rename on write, timestamped backups
//! - [`MemoryAdapter`]: in-process map with a write log and failure injection

mod adapter;
mod errors;
mod file;
mod memory;

pub use adapter::StorageAdapter;
pub use errors::{StorageError, StorageResult};
pub use file::FileAdapter;
pub use memory::MemoryAdapter;
