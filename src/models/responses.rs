//! Response DTOs for the inspection API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::kv::Blob;
use crate::memo::{CacheRecord, Outcome, QuotaUsage};

/// Response body for GET /usage/:operation
#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    /// Operation identity
    pub operation: String,
    /// Local date the usage applies to
    pub date: NaiveDate,
    /// Records written for the date
    pub calls: u32,
    /// Daily limit reported against
    pub max_calls: u32,
    /// Fresh calls still allowed
    pub remaining: u32,
}

impl UsageResponse {
    pub fn new(operation: impl Into<String>, date: NaiveDate, usage: QuotaUsage) -> Self {
        Self {
            operation: operation.into(),
            date,
            calls: usage.calls,
            max_calls: usage.max_calls,
            remaining: usage.remaining,
        }
    }
}

/// Response body for GET /records/:operation/:fingerprint
#[derive(Debug, Clone, Serialize)]
pub struct RecordResponse {
    pub operation: String,
    pub fingerprint: String,
    /// Stored arguments, parsed back into JSON when possible
    pub arguments: Value,
    pub outcome: Outcome,
    pub call_date: NaiveDate,
    pub call_timestamp_ms: i64,
}

impl From<CacheRecord> for RecordResponse {
    fn from(record: CacheRecord) -> Self {
        let arguments = serde_json::from_str(&record.arguments)
            .unwrap_or(Value::String(record.arguments));
        Self {
            operation: record.operation_identity,
            fingerprint: record.fingerprint.to_string(),
            arguments,
            outcome: record.outcome,
            call_date: record.call_date,
            call_timestamp_ms: record.call_timestamp_ms,
        }
    }
}

/// Response body for GET /kv/:key
#[derive(Debug, Clone, Serialize)]
pub struct KvGetResponse {
    pub key: String,
    /// Decoded JSON, or the stored bytes as an array of numbers
    pub value: Value,
    /// True when the stored bytes were not JSON
    pub raw: bool,
}

impl KvGetResponse {
    pub fn new(key: impl Into<String>, blob: Blob<Value>) -> Self {
        let (value, raw) = match blob {
            Blob::Decoded(value) => (value, false),
            Blob::Raw(bytes) => (Value::from(bytes), true),
        };
        Self {
            key: key.into(),
            value,
            raw,
        }
    }
}

/// Response body for PUT /kv
#[derive(Debug, Clone, Serialize)]
pub struct KvSetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl KvSetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /kv/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
