//! Quota Module
//!
//! Daily call accounting derived from the record store.
//!
//! The check is a point-in-time read with no reservation. Invocations racing
//! past the check together can each write a record, so under concurrency the
//! day's count may end above `max_calls` by up to one less than the number of
//! racers. Callers that need a hard cap must bound in-flight executions per
//! operation themselves.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::memo::RecordStore;

// == Quota Usage ==
/// Snapshot of one operation's usage for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    /// Records already written for the date
    pub calls: u32,
    /// Configured daily limit
    pub max_calls: u32,
    /// Fresh calls still allowed
    pub remaining: u32,
}

impl QuotaUsage {
    pub fn new(calls: u32, max_calls: u32) -> Self {
        Self {
            calls,
            max_calls,
            remaining: max_calls.saturating_sub(calls),
        }
    }

    /// A fresh call is allowed while `calls < max_calls`.
    pub fn allows_call(&self) -> bool {
        self.calls < self.max_calls
    }
}

// == Quota Accountant ==
/// Reads daily usage out of a [`RecordStore`].
#[derive(Debug, Clone)]
pub struct QuotaAccountant {
    store: RecordStore,
}

impl QuotaAccountant {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    // == Usage ==
    /// Usage of `operation` on `date` against `max_calls`.
    pub fn usage(&self, operation: &str, date: NaiveDate, max_calls: u32) -> Result<QuotaUsage> {
        let calls = self.store.count_for_date(operation, date)?;
        Ok(QuotaUsage::new(calls, max_calls))
    }

    // == Remaining ==
    /// Whether another fresh call of `operation` is allowed on `date`.
    pub fn remaining(&self, operation: &str, date: NaiveDate, max_calls: u32) -> Result<bool> {
        Ok(self.usage(operation, date, max_calls)?.allows_call())
    }
}
