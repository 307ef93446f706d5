//! Versioned codec
//!
//! Encodes values into `{version, data}` envelopes and decodes stored records
//! back, running registered migrations to bridge the stored version up to the
//! target version.
//!
//! # Decode Sequence
//!
//! 1. Parse the raw text (failure: `CodecError::Decode`)
//! 2. Split the envelope; bare values are version 0
//! 3. If stored < target, apply migrations `stored+1..=target` in order
//! 4. Return the migrated payload, not yet validated
//!
//! A record newer than the target is returned untouched. There is no
//! downgrade path.

mod envelope;
mod errors;
mod migration;

pub use envelope::{encode, inspect, Envelope, RecordInfo};
pub use errors::{CodecError, CodecResult};
pub use migration::{MigrationFailure, MigrationRegistry};

use serde_json::Value;

/// Outcome of decoding one record
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Post-migration payload
    pub payload: Value,
    /// Version found in storage
    pub stored_version: u32,
    /// Version the payload is now at
    pub target_version: u32,
}

impl Decoded {
    /// Stored record is newer than this build understands
    pub fn is_ahead(&self) -> bool {
        self.stored_version > self.target_version
    }
}

/// Decode `raw` and migrate it to `target_version`
pub fn decode_record(
    raw: &str,
    target_version: u32,
    migrations: &MigrationRegistry,
) -> CodecResult<Decoded> {
    let info = inspect(raw)?;
    let payload = migrations.apply(info.payload, info.stored_version, target_version)?;
    Ok(Decoded {
        payload,
        stored_version: info.stored_version,
        target_version,
    })
}

/// Decode `raw` and migrate it to `target_version`, returning only the payload
pub fn decode(raw: &str, target_version: u32, migrations: &MigrationRegistry) -> CodecResult<Value> {
    decode_record(raw, target_version, migrations).map(|d| d.payload)
}
