//! Hashing System - SHA-256 for Bundles
//!
//! Same record + same theme + same engine = same job hash.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

/// Compute manifest hash for a rendered bundle
pub fn compute_manifest_hash<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(manifest)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Compute job hash for a render request
/// job_hash = sha256(theme_id + theme_version + canonical_record + engine_version)
pub fn compute_job_hash(
    theme_id: &str,
    theme_version: &str,
    record: &impl Serialize,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_record = canonical_json(record)?;
    let combined = format!(
        "{}:{}:{}:{}",
        theme_id, theme_version, canonical_record, engine_version
    );
    Ok(sha256_hex(combined.as_bytes()))
}
