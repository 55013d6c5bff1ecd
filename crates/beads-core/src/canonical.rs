//! Canonical JSON serialization and content hashing.
//!
//! Two logically identical JSON values must produce byte-identical output:
//! object keys sorted, no insignificant whitespace, and no trailing newline
//! added by this function (callers that write a log line add their own
//! `\n`). This is what makes the *round-trip* and *idempotent apply*
//! properties provable: the content hash of an issue depends only on its
//! normalized fields, never on field order or formatting.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// A SHA-256 hex digest of a value's canonical JSON serialization.
///
/// Used for deduplication (two records with the same id and the same
/// `ContentHash` are the same logical write) and for the tie-break rule in
/// the import pipeline (lexicographically larger hash wins on a timestamp
/// tie).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already-computed 64-character lowercase hex digest.
    ///
    /// Used when reading a hash back from a log line rather than computing
    /// it fresh.
    #[must_use]
    pub fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recursively sort every JSON object's keys, producing a value whose
/// `serde_json::to_string` output is deterministic regardless of the
/// field order in the original struct or map.
fn canonicalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize_value(v)))
                .collect();
            let mut out = serde_json::Map::with_capacity(sorted.len());
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_value).collect()),
        other => other.clone(),
    }
}

/// Serialize `value` to canonical JSON bytes: sorted object keys, compact
/// (no extra whitespace), stable field order at every nesting level.
///
/// # Errors
///
/// Returns [`Error::NotCanonicalizable`] if `value` cannot be represented
/// as `serde_json::Value` (e.g. a `NaN` float).
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    let raw = serde_json::to_value(value).map_err(|e| Error::NotCanonicalizable {
        detail: e.to_string(),
    })?;
    let sorted = canonicalize_value(&raw);
    serde_json::to_vec(&sorted).map_err(|e| Error::NotCanonicalizable {
        detail: e.to_string(),
    })
}

/// Compute the content hash of a value's canonical JSON serialization.
///
/// # Errors
///
/// Returns [`Error::NotCanonicalizable`] under the same conditions as
/// [`canonical_json`].
pub fn content_hash<T: Serialize>(value: &T) -> Result<ContentHash, Error> {
    let bytes = canonical_json(value)?;
    let digest = Sha256::digest(&bytes);
    Ok(ContentHash(hex::encode(digest)))
}

/// Minimal local hex encoder so this crate doesn't need the `hex` crate
/// just for one call site.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write as _;
        let mut out = String::with_capacity(bytes.as_ref().len() * 2);
        for byte in bytes.as_ref() {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let a = json!({"outer": {"z": 1, "y": 2}});
        let b = json!({"outer": {"y": 2, "z": 1}});
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }

    #[test]
    fn content_hash_is_stable_across_field_order() {
        let a = json!({"id": "p-1", "title": "fix bug", "status": "open"});
        let b = json!({"status": "open", "id": "p-1", "title": "fix bug"});
        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }

    #[test]
    fn content_hash_differs_on_content_change() {
        let a = json!({"id": "p-1", "title": "fix bug"});
        let b = json!({"id": "p-1", "title": "fix bug v2"});
        assert_ne!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }

    #[test]
    fn content_hash_is_64_hex_chars() {
        let h = content_hash(&json!({"id": "p-1"})).unwrap();
        assert_eq!(h.as_str().len(), 64);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
