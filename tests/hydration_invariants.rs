//! Hydration Invariant Tests
//!
//! Test Categories:
//! 1. Round-trip: hydrate then re-serialize yields the same record
//! 2. No writes before readiness
//! 3. Migration chaining
//! 4. Unrecoverable failure keeps the initial value

use std::sync::Arc;
use std::time::Duration;

use persistent_atom::codec::{encode, MigrationFailure};
use persistent_atom::storage::MemoryAdapter;
use persistent_atom::{AtomConfig, AtomError, HydrationPhase, PersistentAtom};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Settings {
    theme: String,
    font_size: u32,
    recent: Vec<String>,
}

impl Settings {
    fn sample() -> Self {
        Self {
            theme: "dark".into(),
            font_size: 14,
            recent: vec!["a.txt".into(), "b.txt".into()],
        }
    }
}

// =============================================================================
// ROUND-TRIP
// =============================================================================

/// Test: Hydrating a written record and flushing it again rewrites the same bytes.
#[tokio::test]
async fn test_idempotent_hydration() {
    let storage = Arc::new(MemoryAdapter::new());

    let writer = PersistentAtom::new(AtomConfig::new("settings", storage.clone(), Settings::sample()));
    writer.ready().await.unwrap();
    writer
        .set_and_flush(Settings {
            theme: "solarized".into(),
            ..Settings::sample()
        })
        .await
        .unwrap();
    let first = storage.get("settings").unwrap();

    let reader = PersistentAtom::new(AtomConfig::new("settings", storage.clone(), Settings::sample()));
    reader.ready().await.unwrap();
    assert_eq!(reader.get().theme, "solarized");
    reader.flush().await.unwrap();

    assert_eq!(storage.get("settings").unwrap(), first);
}

/// Test: A hydrated value is not written back on its own.
#[tokio::test]
async fn test_hydration_does_not_write() {
    let record = encode(&Settings::sample(), 1).unwrap();
    let storage = Arc::new(MemoryAdapter::new().with_entry("settings", record));

    let atom = PersistentAtom::new(AtomConfig::new("settings", storage.clone(), Settings::sample()));
    atom.ready().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(storage.write_count(), 0);
}

/// Test: Subscribers registered before readiness see the hydrated value.
#[tokio::test]
async fn test_subscribers_see_hydrated_value() {
    let storage = Arc::new(
        MemoryAdapter::new()
            .with_entry("n", r#"{"version":1,"data":8}"#)
            .with_read_delay(Duration::from_millis(20)),
    );
    let atom = PersistentAtom::new(AtomConfig::new("n", storage, 0u32));

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    atom.subscribe(move |v| sink.lock().unwrap().push(*v));

    atom.ready().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![8]);
}

// =============================================================================
// NO PRE-HYDRATION WRITES
// =============================================================================

/// Test: set and flush before readiness are rejected and never reach storage.
#[tokio::test]
async fn test_no_pre_hydration_writes() {
    let storage = Arc::new(MemoryAdapter::new().with_read_delay(Duration::from_millis(50)));
    let atom = PersistentAtom::new(AtomConfig::new("n", storage.clone(), 1u32));

    let err = atom.set(2).unwrap_err();
    assert!(matches!(err, AtomError::NotReady { .. }));
    assert!(matches!(atom.flush().await, Err(AtomError::NotReady { .. })));
    assert!(matches!(atom.set_and_flush(3).await, Err(AtomError::NotReady { .. })));
    assert!(atom.update(|n| n + 1).is_err());

    atom.ready().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(atom.get(), 1);
    assert_eq!(storage.write_count(), 0);
}

// =============================================================================
// MIGRATION CHAINING
// =============================================================================

fn push_step(tag: &'static str) -> impl Fn(Value) -> Result<Value, MigrationFailure> + Send + Sync {
    move |mut v: Value| {
        v["steps"]
            .as_array_mut()
            .ok_or("steps is not an array")?
            .push(json!(tag));
        Ok(v)
    }
}

/// Test: Version 1 record is migrated through 2 then 3, in order.
#[tokio::test]
async fn test_migration_chaining() {
    let storage = Arc::new(
        MemoryAdapter::new().with_entry("log", r#"{"version":1,"data":{"steps":[]}}"#),
    );
    let atom = PersistentAtom::new(
        AtomConfig::new("log", storage.clone(), json!({}))
            .version(3)
            .migration(3, push_step("three"))
            .migration(2, push_step("two")),
    );
    atom.ready().await.unwrap();

    assert_eq!(atom.get(), json!({"steps": ["two", "three"]}));
    assert_eq!(storage.write_count(), 0);
}

/// Test: A missing intermediate migration passes the payload through.
#[tokio::test]
async fn test_missing_intermediate_migration_is_skipped() {
    let storage = Arc::new(MemoryAdapter::new().with_entry("n", r#"{"version":1,"data":5}"#));
    let atom = PersistentAtom::new(
        AtomConfig::new("n", storage, 0u64)
            .version(4)
            .migration(2, |v: Value| Ok(json!(v.as_u64().ok_or("not a number")? * 10)))
            .migration(4, |v: Value| Ok(json!(v.as_u64().ok_or("not a number")? + 1))),
    );

    atom.ready().await.unwrap();
    assert_eq!(atom.get(), 51);
}

/// Test: Legacy bare records are version 0 and run every migration.
#[tokio::test]
async fn test_legacy_record_migrates_from_zero() {
    let storage = Arc::new(MemoryAdapter::new().with_entry("name", r#""ada""#));
    let atom = PersistentAtom::new(
        AtomConfig::new("name", storage, json!(null))
            .migration(1, |v: Value| Ok(json!({ "name": v }))),
    );

    atom.ready().await.unwrap();
    assert_eq!(atom.get(), json!({"name": "ada"}));
}

/// Test: A failing migration surfaces with its version.
#[tokio::test]
async fn test_migration_failure_rejects_ready() {
    let storage = Arc::new(MemoryAdapter::new().with_entry("n", r#"{"version":1,"data":5}"#));
    let atom = PersistentAtom::new(
        AtomConfig::new("n", storage, 0u64)
            .version(2)
            .migration(2, |_| Err("cannot upgrade".into())),
    );

    match atom.ready().await.unwrap_err() {
        AtomError::Migration { version, cause, .. } => {
            assert_eq!(version, 2);
            assert!(cause.contains("cannot upgrade"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// UNRECOVERABLE FAILURE
// =============================================================================

/// Test: Corrupt record without fallback rejects ready with the decode error.
#[tokio::test]
async fn test_unrecoverable_failure() {
    let storage = Arc::new(MemoryAdapter::new().with_backups().with_entry("n", "{not json"));
    let atom = PersistentAtom::new(AtomConfig::new("n", storage.clone(), 7u32));

    let err = atom.ready().await.unwrap_err();
    assert!(matches!(err, AtomError::Decode { .. }));
    assert_eq!(atom.phase(), HydrationPhase::Failed);
    assert_eq!(atom.get(), 7);

    // Still rejected on a second wait
    assert_eq!(atom.ready().await.unwrap_err(), err);

    // The atom refuses to overwrite the corrupt record
    assert!(matches!(atom.set(8), Err(AtomError::NotReady { .. })));
    assert!(atom.flush().await.is_err());
    assert_eq!(storage.write_count(), 0);
    assert_eq!(storage.get("n").unwrap(), "{not json");

    // Backup is still taken
    assert_eq!(storage.backups().len(), 1);
}
