//! Content hashing for audit events
//!
//! Canonicalizes a payload (objects rewritten with sorted keys, no
//! insignificant whitespace) and applies SHA-256 over the UTF-8 encoding,
//! returning a lowercase hex digest. Pure and deterministic: the key
//! order of the input never changes the digest.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Compute the deterministic content hash of a payload.
pub fn commit<T: Serialize>(payload: &T) -> Result<String, CommitError> {
    let value = serde_json::to_value(payload)?;
    let canonical = canonical_json(&value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Render a JSON value in canonical form: object keys sorted, arrays in
/// order, no whitespace.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            // BTreeMap gives sorted-key iteration
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let fields: Vec<String> = sorted
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).expect("string key serializes"),
                        canonical_json(v)
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let elems: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", elems.join(","))
        }
        // Scalars already have a single serde_json rendering
        other => serde_json::to_string(other).expect("scalar serializes"),
    }
}
