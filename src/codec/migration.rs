//! Migration registry
//!
//! A migration is registered under the version it produces. Bridging stored
//! version `from` to target `to` applies every registered step in
//! `from+1..=to`, ascending. Versions without a step pass the payload through
//! unchanged, so no-op version bumps need no registration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::errors::{CodecError, CodecResult};

/// Error a migration step may return
pub type MigrationFailure = Box<dyn std::error::Error + Send + Sync>;

type MigrationFn = Arc<dyn Fn(Value) -> Result<Value, MigrationFailure> + Send + Sync>;

/// Ordered set of migration steps keyed by produced version
#[derive(Clone, Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<u32, MigrationFn>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the step producing `version`. Replaces any earlier step for it.
    pub fn register<F>(&mut self, version: u32, step: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, MigrationFailure> + Send + Sync + 'static,
    {
        self.steps.insert(version, Arc::new(step));
        self
    }

    /// Builder form of [`MigrationRegistry::register`]
    pub fn with<F>(mut self, version: u32, step: F) -> Self
    where
        F: Fn(Value) -> Result<Value, MigrationFailure> + Send + Sync + 'static,
    {
        self.register(version, step);
        self
    }

    pub fn contains(&self, version: u32) -> bool {
        self.steps.contains_key(&version)
    }

    /// Registered versions, ascending
    pub fn versions(&self) -> Vec<u32> {
        self.steps.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Bring `payload` from version `from` up to `to`.
    ///
    /// Does nothing when `from >= to`; there is no downgrade path.
    pub fn apply(&self, mut payload: Value, from: u32, to: u32) -> CodecResult<Value> {
        if from >= to {
            return Ok(payload);
        }
        for (&version, step) in self.steps.range(from + 1..=to) {
            payload = step(payload).map_err(|cause| CodecError::Migration {
                version,
                cause: cause.to_string(),
            })?;
        }
        Ok(payload)
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn push(tag: &'static str) -> impl Fn(Value) -> Result<Value, MigrationFailure> {
        move |mut v: Value| {
            if let Some(arr) = v.as_array_mut() {
                arr.push(json!(tag));
            }
            Ok(v)
        }
    }

    #[test]
    fn test_applies_in_ascending_order() {
        let registry = MigrationRegistry::new()
            .with(3, push("v3"))
            .with(2, push("v2"));

        let out = registry.apply(json!([]), 1, 3).unwrap();
        assert_eq!(out, json!(["v2", "v3"]));
    }

    #[test]
    fn test_missing_step_passes_through() {
        let registry = MigrationRegistry::new().with(4, push("v4"));
        let out = registry.apply(json!([]), 1, 4).unwrap();
        assert_eq!(out, json!(["v4"]));
    }

    #[test]
    fn test_steps_outside_range_ignored() {
        let registry = MigrationRegistry::new()
            .with(1, push("v1"))
            .with(2, push("v2"))
            .with(5, push("v5"));
        let out = registry.apply(json!([]), 1, 3).unwrap();
        assert_eq!(out, json!(["v2"]));
    }

    #[test]
    fn test_no_downgrade() {
        let registry = MigrationRegistry::new().with(2, push("v2"));
        assert_eq!(registry.apply(json!([]), 5, 2).unwrap(), json!([]));
        assert_eq!(registry.apply(json!([]), 2, 2).unwrap(), json!([]));
    }

    #[test]
    fn test_failure_carries_version() {
        let registry = MigrationRegistry::new()
            .with(2, push("v2"))
            .with(3, |_| Err("shape changed".into()));

        let err = registry.apply(json!([]), 0, 3).unwrap_err();
        assert_eq!(
            err,
            CodecError::Migration {
                version: 3,
                cause: "shape changed".into()
            }
        );
    }

    #[test]
    fn test_versions_listed() {
        let registry = MigrationRegistry::new().with(3, push("a")).with(1, push("b"));
        assert_eq!(registry.versions(), vec![1, 3]);
        assert!(registry.contains(3));
        assert!(!registry.contains(2));
    }
}
