//! Memo Module
//!
//! Persistent memoization of expensive operations with a per-day call quota.
//! Every fresh call is recorded with its arguments, outcome and timestamp.

mod clock;
mod finite;
mod fingerprint;
mod invoker;
mod quota;
mod record;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{CallTime, Clock, FixedClock, SystemClock};
pub use finite::ensure_finite;
pub use fingerprint::{canonical_json, Fingerprint};
pub use invoker::{Delivery, Invoker, Memoized};
pub use quota::{QuotaAccountant, QuotaUsage};
pub use record::{CacheRecord, Outcome, DATE_FORMAT};
pub use store::RecordStore;

// == Public Constants ==
/// Daily call limit used when none is configured
pub const DEFAULT_MAX_CALLS: u32 = 99;

/// Digest bytes kept in a fingerprint (128 bits)
pub const FINGERPRINT_BYTES: usize = 16;
