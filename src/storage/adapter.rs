//! # Storage Adapter Trait

use std::fmt;

use futures_util::future::BoxFuture;

use super::errors::{StorageError, StorageResult};

/// Asynchronous string store addressed by key.
///
/// Object safe; implementations return boxed futures so an atom can hold an
/// `Arc<dyn StorageAdapter>`.
pub trait StorageAdapter: Send + Sync + fmt::Debug {
    /// Diagnostic identifier used in logs
    fn name(&self) -> &str;

    /// Read the record stored under `key`. `Ok(None)` means no record.
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>>;

    /// Replace the record stored under `key`. Must fail rather than drop data.
    fn set_item<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, StorageResult<()>>;

    /// Physical location of the record for `key`, if the adapter has one
    fn location(&self, _key: &str) -> Option<String> {
        None
    }

    /// Whether [`StorageAdapter::create_backup`] is implemented
    fn supports_backup(&self) -> bool {
        false
    }

    /// Copy the artifact at `location` aside. Returns where the copy went.
    fn create_backup<'a>(&'a self, _location: &'a str) -> BoxFuture<'a, StorageResult<String>> {
        let name = self.name().to_string();
        Box::pin(async move { Err(StorageError::BackupUnsupported(name)) })
    }
}
