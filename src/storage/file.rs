//! # File Adapter
//!
//! One JSON file per key under a root directory:
//!
//! ```text
//! <root>/<key>.json                         current record
//! <root>/<key>.json.tmp                     in-flight write
//! <root>/<key>.json.corrupt-<stamp>.bak     backups of corrupt records
//! ```
//!
//! Writes go to the temp file, are fsynced, then renamed over the record so a
//! crash mid-write leaves either the old or the new record, never a torn one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::adapter::StorageAdapter;
use super::errors::{StorageError, StorageResult};

const RECORD_EXTENSION: &str = "json";
const BACKUP_MARKER: &str = ".corrupt-";
const BACKUP_SUFFIX: &str = ".bak";

/// File-backed storage adapter
#[derive(Debug, Clone)]
pub struct FileAdapter {
    root: PathBuf,
}

impl FileAdapter {
    /// Create an adapter rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for `key`
    pub fn record_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.{}", key, RECORD_EXTENSION)))
    }

    /// Backups created for `key`, oldest first
    pub async fn backups(&self, key: &str) -> StorageResult<Vec<PathBuf>> {
        validate_key(key)?;
        let prefix = format!("{}.{}{}", key, RECORD_EXTENSION, BACKUP_MARKER);

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) && name.ends_with(BACKUP_SUFFIX) {
                    found.push(entry.path());
                }
            }
        }
        // Timestamps sort lexicographically.
        found.sort();
        Ok(found)
    }

    async fn read_record(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.record_path(key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| StorageError::InvalidData(format!("{}: {}", path.display(), e)))
    }

    async fn write_record(&self, key: &str, value: String) -> StorageResult<()> {
        let path = self.record_path(key)?;
        fs::create_dir_all(&self.root).await?;

        let tmp = path.with_extension(format!("{}.tmp", RECORD_EXTENSION));
        {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(value.as_bytes()).await?;
            file.sync_all().await?;
        }
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn copy_aside(&self, location: &str) -> StorageResult<String> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let backup = format!("{}{}{}{}", location, BACKUP_MARKER, stamp, BACKUP_SUFFIX);
        fs::copy(location, &backup).await?;
        Ok(backup)
    }
}

impl StorageAdapter for FileAdapter {
    fn name(&self) -> &str {
        "file"
    }

    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>> {
        Box::pin(self.read_record(key))
    }

    fn set_item<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(self.write_record(key, value))
    }

    fn location(&self, key: &str) -> Option<String> {
        self.record_path(key)
            .ok()
            .map(|p| p.to_string_lossy().into_owned())
    }

    fn supports_backup(&self) -> bool {
        true
    }

    fn create_backup<'a>(&'a self, location: &'a str) -> BoxFuture<'a, StorageResult<String>> {
        Box::pin(self.copy_aside(location))
    }
}

/// Keys become file names, so anything that could escape the root is refused.
fn validate_key(key: &str) -> StorageResult<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.chars().any(|c| matches!(c, '/' | '\\' | '\0'));
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
