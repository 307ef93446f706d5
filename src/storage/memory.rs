//! # Memory Adapter
//!
//! In-process key-value store. Keeps a log of every write and can be told to
//! fail reads, writes or backups, which makes it the adapter of choice for
//! exercising the engine's failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;

use futures_util::future::BoxFuture;

use super::adapter::StorageAdapter;
use super::errors::{StorageError, StorageResult};

const LOCATION_SCHEME: &str = "memory://";

/// In-memory storage adapter
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: RwLock<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    backups: Mutex<Vec<(String, String)>>,
    with_locations: bool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_backups: AtomicBool,
    read_delay: Option<Duration>,
    write_delay: Option<Duration>,
}

impl MemoryAdapter {
    /// Empty adapter without locations or backup support
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        write_lock(&self.entries).insert(key.into(), value.into());
        self
    }

    /// Expose `memory://<key>` locations and accept backups
    pub fn with_backups(mut self) -> Self {
        self.with_locations = true;
        self
    }

    /// Delay every read, to hold an atom in its pre-hydration window
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Delay every write
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_backups(&self, fail: bool) {
        self.fail_backups.store(fail, Ordering::SeqCst);
    }

    /// Current record for `key`, bypassing the async interface
    pub fn get(&self, key: &str) -> Option<String> {
        read_lock(&self.entries).get(key).cloned()
    }

    /// Replace a record directly, without logging a write
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        write_lock(&self.entries).insert(key.into(), value.into());
    }

    /// Every successful write as `(key, value)`, in order
    pub fn writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }

    /// Successful writes for one key
    pub fn writes_for(&self, key: &str) -> Vec<String> {
        lock(&self.writes)
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.writes).len()
    }

    /// Backups taken as `(location, copied value)`
    pub fn backups(&self) -> Vec<(String, String)> {
        lock(&self.backups).clone()
    }

    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("read of '{}' refused", key)));
        }
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, value: String) -> StorageResult<()> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("write of '{}' refused", key)));
        }
        write_lock(&self.entries).insert(key.to_string(), value.clone());
        lock(&self.writes).push((key.to_string(), value));
        Ok(())
    }

    async fn backup(&self, location: &str) -> StorageResult<String> {
        if self.fail_backups.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("backup of '{}' refused", location)));
        }
        let key = location
            .strip_prefix(LOCATION_SCHEME)
            .ok_or_else(|| StorageError::InvalidKey(location.to_string()))?;
        let value = self
            .get(key)
            .ok_or_else(|| StorageError::Backend(format!("nothing stored at '{}'", location)))?;

        let mut backups = lock(&self.backups);
        backups.push((location.to_string(), value));
        Ok(format!("{}#backup-{}", location, backups.len()))
    }
}

impl StorageAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>> {
        Box::pin(self.read(key))
    }

    fn set_item<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(self.write(key, value))
    }

    fn location(&self, key: &str) -> Option<String> {
        self.with_locations
            .then(|| format!("{}{}", LOCATION_SCHEME, key))
    }

    fn supports_backup(&self) -> bool {
        self.with_locations
    }

    fn create_backup<'a>(&'a self, location: &'a str) -> BoxFuture<'a, StorageResult<String>> {
        Box::pin(self.backup(location))
    }
}

// A panic while holding one of these locks cannot leave the maps half-updated,
// so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
