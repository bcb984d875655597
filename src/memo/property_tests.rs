//! Property-Based Tests for Memo Module
//!
//! Uses proptest to check caching and quota behaviour over generated inputs.

use proptest::prelude::*;
use std::cell::Cell;
use std::collections::HashSet;

use chrono::{Local, NaiveDate, TimeZone};
use serde_json::json;
use tempfile::{tempdir, TempDir};

use crate::db::SqliteSettings;
use crate::error::{InvokeError, MemoError};
use crate::memo::{CacheRecord, Delivery, Fingerprint, FixedClock, Invoker, Outcome, RecordStore};

// == Helpers ==
fn fresh_invoker() -> (TempDir, Invoker) {
    let dir = tempdir().unwrap();
    let store = RecordStore::open(SqliteSettings::new(dir.path().join("memo.db"))).unwrap();
    let clock = FixedClock::at(Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    (dir, Invoker::new(store).with_clock(clock))
}

fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn double(args: &(i64, String)) -> Result<String, String> {
    Ok(format!("{}{}", args.1, args.1).repeat(args.0.clamp(1, 3) as usize))
}

// == Strategies ==
fn args_strategy() -> impl Strategy<Value = (i64, String)> {
    (-1000i64..1000, "[a-z]{0,8}")
}

#[test]
fn test_no_collisions_in_small_int_tuples() {
    let mut seen = HashSet::new();
    for a in 0..100i64 {
        for b in 0..100i64 {
            seen.insert(Fingerprint::derive(&(a, b)).unwrap());
        }
    }
    assert_eq!(seen.len(), 10_000);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Invoking twice with the same arguments runs the operation once and
    // returns the first outcome both times.
    #[test]
    fn prop_repeat_call_runs_once(args in args_strategy()) {
        let (_dir, invoker) = fresh_invoker();
        let runs = Cell::new(0);
        let op = |a: &(i64, String)| {
            runs.set(runs.get() + 1);
            double(a)
        };

        let first = invoker.invoke("double", &args, 5, op).unwrap();
        let second = invoker.invoke("double", &args, 5, op).unwrap();

        prop_assert_eq!(runs.get(), 1);
        prop_assert_eq!(first.value(), second.value());
    }

    // Cache hits never add to the day's count.
    #[test]
    fn prop_hits_do_not_count(values in prop::collection::hash_set(0i64..500, 1..12)) {
        let (_dir, invoker) = fresh_invoker();
        let square = |a: &(i64,)| Ok::<_, String>(a.0 * a.0);

        for v in &values {
            invoker.invoke("square", &(*v,), 100, square).unwrap();
        }
        for v in &values {
            let hit = invoker.invoke("square", &(*v,), 100, square).unwrap();
            prop_assert!(hit.is_cached());
        }

        let calls = invoker.store().count_for_date("square", fixed_date()).unwrap();
        prop_assert_eq!(calls as usize, values.len());
    }

    // With max_calls = N the N-th distinct call succeeds and the (N+1)-th fails.
    #[test]
    fn prop_quota_boundary(max_calls in 1u32..8) {
        let (_dir, invoker) = fresh_invoker();
        let square = |a: &(i64,)| Ok::<_, String>(a.0 * a.0);

        for n in 0..max_calls {
            let delivered = invoker.invoke("square", &(n as i64,), max_calls, square).unwrap();
            prop_assert_eq!(delivered, Delivery::Computed((n as i64) * (n as i64)));
        }

        let over = invoker.invoke("square", &(max_calls as i64,), max_calls, square);
        let rejected = matches!(over, Err(InvokeError::Memo(MemoError::QuotaExceeded { .. })));
        prop_assert!(rejected);
        prop_assert_eq!(
            invoker.store().count_for_date("square", fixed_date()).unwrap(),
            max_calls
        );
    }

    // Repeated upserts of one key leave exactly one row.
    #[test]
    fn prop_upsert_keeps_one_row(outcomes in prop::collection::vec(any::<i32>(), 1..10)) {
        let (_dir, invoker) = fresh_invoker();
        let store = invoker.store();
        let fingerprint = Fingerprint::derive(&(7,)).unwrap();

        for value in &outcomes {
            store.upsert(&CacheRecord {
                operation_identity: "seven".to_string(),
                fingerprint: fingerprint.clone(),
                arguments: "[7]".to_string(),
                outcome: Outcome::Value(json!(value)),
                call_date: fixed_date(),
                call_timestamp_ms: 0,
            }).unwrap();
        }

        prop_assert_eq!(store.count_records("seven").unwrap(), 1);
        let last = outcomes.last().copied().unwrap();
        prop_assert_eq!(
            store.lookup("seven", &fingerprint).unwrap(),
            Some(Outcome::Value(json!(last)))
        );
    }
}
