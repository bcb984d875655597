//! Cache Record Module
//!
//! Defines the stored outcome of one invocation and the audit row around it.

use std::fmt::Display;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::memo::{ensure_finite, Fingerprint};

/// Format of the `call_date` column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// == Outcome ==
/// What an invocation produced: a value or the text of its failure.
///
/// Serialized externally tagged, `{"value": ...}` or `{"failure": "..."}`,
/// so a recorded failure never reads back as a successful string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Value(Value),
    Failure(String),
}

impl Outcome {
    /// Captures a successful result. Non-finite floats are rejected.
    pub fn success<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        ensure_finite(value)?;
        Ok(Outcome::Value(serde_json::to_value(value)?))
    }

    /// Captures a failure by its display text.
    pub fn failure(err: &impl Display) -> Self {
        Outcome::Failure(err.to_string())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Decodes a stored success into `T`. Failures come back as their text.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<std::result::Result<T, String>> {
        match self {
            Outcome::Value(value) => Ok(Ok(serde_json::from_value(value)?)),
            Outcome::Failure(text) => Ok(Err(text)),
        }
    }

    // == Encode / Decode ==
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

// == Cache Record ==
/// One row of the record store, keyed by (operation identity, fingerprint).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheRecord {
    /// Stable name of the memoized operation
    pub operation_identity: String,
    /// Digest of the arguments
    pub fingerprint: Fingerprint,
    /// Canonical JSON of the arguments, kept for auditing only
    pub arguments: String,
    /// Value or failure produced by the call
    pub outcome: Outcome,
    /// Local calendar date the call started on
    pub call_date: NaiveDate,
    /// Unix milliseconds at call start
    pub call_timestamp_ms: i64,
}
