//! Versioned envelope
//!
//! Wire format:
//!
//! ```json
//! { "version": 2, "data": { "theme": "dark" } }
//! ```
//!
//! A record that is not an envelope is a legacy bare value at version 0.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{CodecError, CodecResult};

const VERSION_FIELD: &str = "version";
const DATA_FIELD: &str = "data";

/// Version tag plus payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    pub version: u32,
    pub data: P,
}

/// What a raw record contains, before migration
#[derive(Debug, Clone, PartialEq)]
pub struct RecordInfo {
    /// Version the record was written at; 0 for legacy records
    pub stored_version: u32,
    /// True when the record had no envelope
    pub legacy: bool,
    pub payload: Value,
}

/// Serialize `value` wrapped in an envelope tagged `version`
pub fn encode<T: Serialize>(value: &T, version: u32) -> CodecResult<String> {
    serde_json::to_string(&Envelope {
        version,
        data: value,
    })
    .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Parse a raw record and split off its envelope, if any
pub fn inspect(raw: &str) -> CodecResult<RecordInfo> {
    let parsed: Value = serde_json::from_str(raw).map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(split_envelope(parsed))
}

/// An envelope is an object with exactly `version` (fitting u32) and `data`.
/// Anything else, including objects that merely have a `version` key, is legacy.
fn split_envelope(parsed: Value) -> RecordInfo {
    let version = match &parsed {
        Value::Object(map) if map.len() == 2 && map.contains_key(DATA_FIELD) => map
            .get(VERSION_FIELD)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok()),
        _ => None,
    };

    match (version, parsed) {
        (Some(stored_version), Value::Object(mut map)) => RecordInfo {
            stored_version,
            legacy: false,
            payload: map.remove(DATA_FIELD).unwrap_or(Value::Null),
        },
        (_, payload) => RecordInfo {
            stored_version: 0,
            legacy: true,
            payload,
        },
    }
}
