//! Invoker Module
//!
//! Memoizing, rate-limited execution of caller-supplied operations.
//!
//! A call goes through three gates in order:
//! 1. cache lookup by `(operation, fingerprint)`; a hit returns the stored
//!    outcome and never touches the quota;
//! 2. quota check against today's record count; a rejection writes nothing;
//! 3. execution, after which the outcome (value or failure text) is written
//!    before anything is returned.
//!
//! No storage transaction is open while the operation runs.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::db;
use crate::error::{InvokeError, MemoError, Result};
use crate::memo::clock::CallTime;
use crate::memo::fingerprint::canonical_json;
use crate::memo::{
    CacheRecord, Clock, Fingerprint, Outcome, QuotaAccountant, RecordStore, SystemClock,
};

// == Delivery ==
/// What a successful `invoke` hands back.
///
/// A cache hit on a call that previously failed is *not* an error: it comes
/// back as `RecordedFailure` with the stored failure text, while the original
/// fresh call surfaced the failure as `InvokeError::Operation`.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    /// The operation ran during this call
    Computed(T),
    /// Decoded from a stored successful outcome
    Cached(T),
    /// Stored failure text from an earlier call with the same arguments
    RecordedFailure(String),
}

impl<T> Delivery<T> {
    /// The value, unless this is a recorded failure.
    pub fn value(self) -> Option<T> {
        match self {
            Delivery::Computed(value) | Delivery::Cached(value) => Some(value),
            Delivery::RecordedFailure(_) => None,
        }
    }

    pub fn recorded_failure(&self) -> Option<&str> {
        match self {
            Delivery::RecordedFailure(text) => Some(text),
            _ => None,
        }
    }

    /// True when served from the record store.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Delivery::Computed(_))
    }
}

// == Pending Call ==
/// Key and time of a call, fixed before any storage access.
#[derive(Debug, Clone)]
struct PendingCall {
    operation: String,
    fingerprint: Fingerprint,
    arguments: String,
    call: CallTime,
}

impl PendingCall {
    fn into_record(self, outcome: Outcome) -> CacheRecord {
        CacheRecord {
            operation_identity: self.operation,
            fingerprint: self.fingerprint,
            arguments: self.arguments,
            outcome,
            call_date: self.call.date,
            call_timestamp_ms: self.call.timestamp_ms,
        }
    }
}

enum Admission {
    Hit(Outcome),
    Admitted(PendingCall),
}

// == Invoker ==
/// Wraps operations with a persistent cache and a per-day call quota.
///
/// Cheap to clone; clones share the same backing file and clock.
#[derive(Debug, Clone)]
pub struct Invoker {
    store: RecordStore,
    quota: QuotaAccountant,
    clock: Arc<dyn Clock>,
    strict_writes: bool,
}

impl Invoker {
    // == Constructor ==
    /// Creates an invoker over `store` using the system clock.
    pub fn new(store: RecordStore) -> Self {
        Self {
            quota: QuotaAccountant::new(store.clone()),
            store,
            clock: Arc::new(SystemClock),
            strict_writes: false,
        }
    }

    /// Replaces the clock used to stamp records.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// When set, a failed record write after execution is returned as the
    /// call's error instead of the computed outcome.
    ///
    /// Off by default: the outcome is delivered and the write failure logged.
    pub fn strict_writes(mut self, strict: bool) -> Self {
        self.strict_writes = strict;
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn quota(&self) -> &QuotaAccountant {
        &self.quota
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // == Invoke ==
    /// Runs `op(args)` unless its outcome is already recorded.
    ///
    /// # Arguments
    /// * `operation` - Stable identity of the operation
    /// * `args` - Arguments, fingerprinted via their canonical JSON
    /// * `max_calls` - Fresh executions allowed per calendar day
    /// * `op` - The operation itself
    ///
    /// # Errors
    /// * `Memo(Serialization)` - `args` (or the produced value) has no JSON form
    /// * `Memo(QuotaExceeded)` - cache miss with the day's quota used up
    /// * `Memo(Storage)` - the record store failed
    /// * `Operation(e)` - `op` failed during this call; the failure was recorded
    pub fn invoke<A, T, E, F>(
        &self,
        operation: &str,
        args: &A,
        max_calls: u32,
        op: F,
    ) -> std::result::Result<Delivery<T>, InvokeError<E>>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce(&A) -> std::result::Result<T, E>,
    {
        let pending = self.begin(operation, args)?;

        let pending = match self.admit(pending, max_calls)? {
            Admission::Hit(outcome) => return Ok(deliver_cached(outcome)?),
            Admission::Admitted(pending) => pending,
        };

        let result = op(args);
        log_execution(&pending, &result);
        let (record, encode_error) = record_for(pending, &result);
        let write = self.store.upsert(&record);
        self.settle(&record, write, encode_error, result)
    }

    // == Invoke Async ==
    /// Async form of [`invoke`](Self::invoke).
    ///
    /// Storage steps run on tokio's blocking pool; `op`'s future is awaited
    /// with no storage transaction open.
    pub async fn invoke_async<'a, A, T, E, F, Fut>(
        &self,
        operation: &str,
        args: &'a A,
        max_calls: u32,
        op: F,
    ) -> std::result::Result<Delivery<T>, InvokeError<E>>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce(&'a A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let pending = self.begin(operation, args)?;

        let invoker = self.clone();
        let admission = db::run_blocking(move || invoker.admit(pending, max_calls)).await?;
        let pending = match admission {
            Admission::Hit(outcome) => return Ok(deliver_cached(outcome)?),
            Admission::Admitted(pending) => pending,
        };

        let result = op(args).await;
        log_execution(&pending, &result);
        let (record, encode_error) = record_for(pending, &result);
        let store = self.store.clone();
        let to_write = record.clone();
        let write = db::run_blocking(move || store.upsert(&to_write)).await;
        self.settle(&record, write, encode_error, result)
    }

    // == Bind ==
    /// Binds an operation to its identity and limit, replacing a decorator.
    pub fn bind<F>(&self, operation: impl Into<String>, max_calls: u32, op: F) -> Memoized<F> {
        Memoized {
            invoker: self.clone(),
            operation: operation.into(),
            max_calls,
            op,
        }
    }

    // == Internal Steps ==
    /// Reads the clock once and fingerprints the arguments.
    fn begin<A: Serialize + ?Sized>(&self, operation: &str, args: &A) -> Result<PendingCall> {
        let call = CallTime::read(self.clock.as_ref());
        let arguments = canonical_json(args)?;
        let fingerprint = Fingerprint::of_canonical(&arguments);
        Ok(PendingCall {
            operation: operation.to_string(),
            fingerprint,
            arguments,
            call,
        })
    }

    /// Cache lookup, then quota check. Each is its own short transaction.
    fn admit(&self, pending: PendingCall, max_calls: u32) -> Result<Admission> {
        if let Some(outcome) = self.store.lookup(&pending.operation, &pending.fingerprint)? {
            debug!("cache hit for {}/{}", pending.operation, pending.fingerprint);
            return Ok(Admission::Hit(outcome));
        }

        let allowed = self
            .quota
            .remaining(&pending.operation, pending.call.date, max_calls)?;
        if !allowed {
            warn!(
                "{} rejected: daily limit of {} calls reached for {}",
                pending.operation, max_calls, pending.call.date
            );
            return Err(MemoError::QuotaExceeded {
                operation: pending.operation,
                max_calls,
            });
        }

        debug!("cache miss for {}/{}", pending.operation, pending.fingerprint);
        Ok(Admission::Admitted(pending))
    }

    /// Applies the write policy and converts the outcome at the boundary.
    fn settle<T, E>(
        &self,
        record: &CacheRecord,
        write: Result<()>,
        encode_error: Option<MemoError>,
        result: std::result::Result<T, E>,
    ) -> std::result::Result<Delivery<T>, InvokeError<E>> {
        if let Err(err) = write {
            if self.strict_writes {
                return Err(err.into());
            }
            error!(
                "failed to record {}/{}: {}",
                record.operation_identity, record.fingerprint, err
            );
        }

        if let Some(err) = encode_error {
            return Err(err.into());
        }

        match result {
            Ok(value) => Ok(Delivery::Computed(value)),
            Err(err) => Err(InvokeError::Operation(err)),
        }
    }
}

fn log_execution<T, E: Display>(pending: &PendingCall, result: &std::result::Result<T, E>) {
    match result {
        Ok(_) => info!("executed {}/{}", pending.operation, pending.fingerprint),
        Err(err) => info!(
            "executed {}/{}: failed: {}",
            pending.operation, pending.fingerprint, err
        ),
    }
}

/// Builds the row to write. A value that cannot be encoded, or whose encoding
/// does not read back as `T`, is recorded as a failure, so the execution
/// still counts against the quota, and the encode error is handed back for
/// the caller.
fn record_for<T: Serialize + DeserializeOwned, E: Display>(
    pending: PendingCall,
    result: &std::result::Result<T, E>,
) -> (CacheRecord, Option<MemoError>) {
    let (outcome, encode_error) = match result {
        Ok(value) => match readable_success(value) {
            Ok(outcome) => (outcome, None),
            Err(err) => (Outcome::Failure(format!("unrecordable outcome: {err}")), Some(err)),
        },
        Err(err) => (Outcome::failure(err), None),
    };
    (pending.into_record(outcome), encode_error)
}

/// Encodes `value` and checks that a later hit can decode it again.
fn readable_success<T: Serialize + DeserializeOwned>(value: &T) -> Result<Outcome> {
    let outcome = Outcome::success(value)?;
    if let Outcome::Value(encoded) = &outcome {
        serde_json::from_value::<T>(encoded.clone())?;
    }
    Ok(outcome)
}

fn deliver_cached<T: DeserializeOwned>(outcome: Outcome) -> Result<Delivery<T>> {
    Ok(match outcome.into_typed()? {
        Ok(value) => Delivery::Cached(value),
        Err(text) => Delivery::RecordedFailure(text),
    })
}

// == Memoized ==
/// An operation bound to an [`Invoker`], an identity and a daily limit.
#[derive(Debug, Clone)]
pub struct Memoized<F> {
    invoker: Invoker,
    operation: String,
    max_calls: u32,
    op: F,
}

impl<F> Memoized<F> {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    /// Calls the bound operation through the invoker.
    pub fn call<A, T, E>(&self, args: &A) -> std::result::Result<Delivery<T>, InvokeError<E>>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: Display,
        F: Fn(&A) -> std::result::Result<T, E>,
    {
        self.invoker
            .invoke(&self.operation, args, self.max_calls, |a| (self.op)(a))
    }
}
