//! KV Module
//!
//! Key/value blob store for unrelated state persistence. One row per key,
//! replace-on-write, no quota.

mod store;

pub use store::{validate_key, Blob, KvStore};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
