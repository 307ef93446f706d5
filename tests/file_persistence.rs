//! File Persistence Tests
//!
//! End to end against `FileAdapter`: settings file, debounced writes,
//! shutdown flush and rehydration in a fresh atom.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use persistent_atom::{AtomConfig, AtomSettings, PersistentAtom, ShutdownFlush};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Counter {
    hits: u64,
}

fn settings_for(temp: &TempDir, debounce_ms: u64) -> AtomSettings {
    let text = format!(
        r#"{{"data_dir":{},"version":2,"debounce_ms":{}}}"#,
        serde_json::to_string(&temp.path()).unwrap(),
        debounce_ms
    );
    AtomSettings::from_json(&text).unwrap()
}

fn open(settings: &AtomSettings) -> PersistentAtom<Counter> {
    PersistentAtom::new(
        AtomConfig::new("counter", Arc::new(settings.file_adapter()), Counter::default())
            .with_settings(settings),
    )
}

/// Test: Shutdown flush persists a value still inside its debounce window.
#[tokio::test]
async fn test_shutdown_flush_persists_pending_value() {
    let temp = TempDir::new().unwrap();
    let settings = settings_for(&temp, 10_000);

    let atom = open(&settings);
    atom.ready().await.unwrap();
    for _ in 0..3 {
        atom.update(|c| Counter { hits: c.hits + 1 }).unwrap();
    }
    let record = settings.file_adapter().record_path("counter").unwrap();
    assert!(!record.exists());

    let shutdown = ShutdownFlush::new();
    shutdown.register_shutdown_flush(&atom);
    let report = shutdown.flush_all_within(Duration::from_secs(5)).await;
    assert!(report.is_clean());
    assert_eq!(
        fs::read_to_string(&record).unwrap(),
        r#"{"version":2,"data":{"hits":3}}"#
    );

    let reopened = open(&settings);
    reopened.ready().await.unwrap();
    assert_eq!(reopened.get(), Counter { hits: 3 });
}

/// Test: Debounced writes land on disk after the window closes.
#[tokio::test]
async fn test_debounced_write_reaches_disk() {
    let temp = TempDir::new().unwrap();
    let settings = settings_for(&temp, 20);

    let atom = open(&settings);
    atom.ready().await.unwrap();
    atom.set(Counter { hits: 41 }).unwrap();
    atom.set(Counter { hits: 42 }).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let record = settings.file_adapter().record_path("counter").unwrap();
    assert_eq!(
        fs::read_to_string(&record).unwrap(),
        r#"{"version":2,"data":{"hits":42}}"#
    );
    // No temp file left behind
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

/// Test: A version 1 record from an older build is migrated on load.
#[tokio::test]
async fn test_old_record_migrates_on_load() {
    let temp = TempDir::new().unwrap();
    let settings = settings_for(&temp, 20);
    let record = settings.file_adapter().record_path("counter").unwrap();
    fs::write(&record, r#"{"version":1,"data":{"count":7}}"#).unwrap();

    let atom = PersistentAtom::new(
        AtomConfig::new("counter", Arc::new(settings.file_adapter()), Counter::default())
            .with_settings(&settings)
            .migration(2, |mut v| {
                let count = v
                    .as_object_mut()
                    .and_then(|o| o.remove("count"))
                    .ok_or("missing count")?;
                Ok(serde_json::json!({ "hits": count }))
            }),
    );

    atom.ready().await.unwrap();
    assert_eq!(atom.get(), Counter { hits: 7 });

    // Stored record is left as-is until the next write
    assert_eq!(
        fs::read_to_string(&record).unwrap(),
        r#"{"version":1,"data":{"count":7}}"#
    );
    atom.flush().await.unwrap();
    assert_eq!(
        fs::read_to_string(&record).unwrap(),
        r#"{"version":2,"data":{"hits":7}}"#
    );
}
