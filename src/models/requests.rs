//! Request DTOs for the inspection API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::kv::validate_key;

/// Request body for storing a blob (PUT /kv)
#[derive(Debug, Clone, Deserialize)]
pub struct KvSetRequest {
    /// The key to store the value under
    pub key: String,
    /// Any JSON value
    pub value: Value,
}

impl KvSetRequest {
    /// Validates the request data against the blob store's key rules
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key)
    }
}

/// Query string for GET /usage/:operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageQuery {
    /// Limit to report against; the configured default when absent
    #[serde(default)]
    pub max_calls: Option<u32>,
}
