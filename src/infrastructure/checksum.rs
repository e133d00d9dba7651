// Content checksums over canonical JSON (sorted keys, compact)
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Rebuilds every object with its keys in sorted order so the rendering does
/// not depend on whether serde_json preserves insertion order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

pub fn canonical_json<T: Serialize>(payload: &T) -> Result<String> {
    let value = serde_json::to_value(payload).context("Failed to serialize payload for checksum")?;
    serde_json::to_string(&canonicalize(value)).context("Failed to render canonical JSON")
}

/// Hex SHA-256 of the canonical JSON rendering.
pub fn content_checksum<T: Serialize>(payload: &T) -> Result<String> {
    let canonical = canonical_json(payload)?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}
