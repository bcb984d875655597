//! Fingerprint Module
//!
//! Derives a stable cache key from an operation's arguments.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{MemoError, Result};
use crate::memo::{ensure_finite, FINGERPRINT_BYTES};

// == Fingerprint ==
/// Hex digest of an argument value's canonical JSON text.
///
/// Object keys are sorted at every depth before hashing. Sequence order
/// (tuple positions, array elements) is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    // == Derive ==
    /// Fingerprints `args`.
    ///
    /// Fails with [`MemoError::Serialization`] if `args` has no JSON form,
    /// e.g. a map keyed by tuples or a NaN float.
    pub fn derive<A: Serialize + ?Sized>(args: &A) -> Result<Self> {
        let canonical = canonical_json(args)?;
        Ok(Self::of_canonical(&canonical))
    }

    /// Hashes text that is already in canonical form.
    pub fn of_canonical(canonical: &str) -> Self {
        let digest = Sha256::digest(canonical.as_bytes());
        Self(hex::encode(&digest[..FINGERPRINT_BYTES]))
    }

    // == Parse ==
    /// Accepts a previously rendered fingerprint (e.g. from a URL path).
    pub fn parse(text: &str) -> Result<Self> {
        let valid = text.len() == FINGERPRINT_BYTES * 2
            && text
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(text.to_string()))
        } else {
            Err(MemoError::InvalidRequest(format!(
                "'{}' is not a {}-character lowercase hex fingerprint",
                text,
                FINGERPRINT_BYTES * 2
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Canonical JSON ==
/// Renders `args` as compact JSON with object keys sorted.
///
/// This is also the text stored in a record's `arguments` column. Non-finite
/// floats are rejected rather than written as `null`.
pub fn canonical_json<A: Serialize + ?Sized>(args: &A) -> Result<String> {
    ensure_finite(args)?;
    let value = serde_json::to_value(args)?;
    Ok(serde_json::to_string(&sort_keys(value))?)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
