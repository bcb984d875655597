//! Record Store Module
//!
//! Durable table of memoized calls, shared by cache lookups and quota counting.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::debug;

use crate::db::{self, SqliteSettings};
use crate::error::{MemoError, Result};
use crate::memo::record::DATE_FORMAT;
use crate::memo::{CacheRecord, Fingerprint, Outcome};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache (
    operation_identity TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    arguments TEXT NOT NULL,
    outcome TEXT NOT NULL,
    call_date TEXT NOT NULL,
    call_timestamp_ms INTEGER NOT NULL,
    PRIMARY KEY (operation_identity, fingerprint)
);
CREATE INDEX IF NOT EXISTS cache_by_call_date ON cache (operation_identity, call_date);
";

// == Record Store ==
/// Handle to the record table in one SQLite file.
///
/// The handle holds no connection. Each method opens one, runs a single
/// transaction and closes it again, so a handle can be cloned freely across
/// threads.
#[derive(Debug, Clone)]
pub struct RecordStore {
    settings: SqliteSettings,
}

impl RecordStore {
    // == Constructor ==
    /// Opens (creating if needed) the record table at `settings.path`.
    pub fn open(settings: SqliteSettings) -> Result<Self> {
        db::initialize(&settings, SCHEMA)?;
        Ok(Self { settings })
    }

    /// Backing database settings.
    pub fn settings(&self) -> &SqliteSettings {
        &self.settings
    }

    // == Lookup ==
    /// Returns the stored outcome for `(operation, fingerprint)`, if any.
    pub fn lookup(&self, operation: &str, fingerprint: &Fingerprint) -> Result<Option<Outcome>> {
        let stored: Option<String> =
            db::with_transaction(&self.settings, TransactionBehavior::Deferred, |tx| {
                Ok(tx
                    .query_row(
                        "SELECT outcome FROM cache WHERE operation_identity = ?1 AND fingerprint = ?2",
                        params![operation, fingerprint.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?)
            })?;

        stored.as_deref().map(Outcome::decode).transpose()
    }

    // == Count For Date ==
    /// Number of records for `operation` stamped with `date`.
    pub fn count_for_date(&self, operation: &str, date: NaiveDate) -> Result<u32> {
        let day = date.format(DATE_FORMAT).to_string();
        let count: i64 =
            db::with_transaction(&self.settings, TransactionBehavior::Deferred, |tx| {
                Ok(tx.query_row(
                    "SELECT COUNT(*) FROM cache WHERE operation_identity = ?1 AND call_date = ?2",
                    params![operation, day],
                    |row| row.get(0),
                )?)
            })?;

        u32::try_from(count)
            .map_err(|_| MemoError::Storage(format!("call count {count} out of range")))
    }

    // == Upsert ==
    /// Writes `record`, replacing any row with the same key.
    pub fn upsert(&self, record: &CacheRecord) -> Result<()> {
        let outcome = record.outcome.encode()?;
        let day = record.call_date.format(DATE_FORMAT).to_string();

        db::with_transaction(&self.settings, TransactionBehavior::Immediate, |tx| {
            tx.execute(
                "INSERT OR REPLACE INTO cache
                    (operation_identity, fingerprint, arguments, outcome, call_date, call_timestamp_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.operation_identity,
                    record.fingerprint.as_str(),
                    record.arguments,
                    outcome,
                    day,
                    record.call_timestamp_ms,
                ],
            )?;
            Ok(())
        })?;

        debug!(
            "recorded {}/{} for {}",
            record.operation_identity, record.fingerprint, day
        );
        Ok(())
    }

    // == Fetch ==
    /// Returns the full audit row for `(operation, fingerprint)`.
    pub fn fetch(
        &self,
        operation: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CacheRecord>> {
        let row: Option<(String, String, String, i64)> =
            db::with_transaction(&self.settings, TransactionBehavior::Deferred, |tx| {
                Ok(tx
                    .query_row(
                        "SELECT arguments, outcome, call_date, call_timestamp_ms FROM cache
                         WHERE operation_identity = ?1 AND fingerprint = ?2",
                        params![operation, fingerprint.as_str()],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?)
            })?;

        let Some((arguments, outcome, day, call_timestamp_ms)) = row else {
            return Ok(None);
        };
        let call_date = NaiveDate::parse_from_str(&day, DATE_FORMAT).map_err(|err| {
            MemoError::Serialization(format!("stored call_date '{day}' is invalid: {err}"))
        })?;

        Ok(Some(CacheRecord {
            operation_identity: operation.to_string(),
            fingerprint: fingerprint.clone(),
            arguments,
            outcome: Outcome::decode(&outcome)?,
            call_date,
            call_timestamp_ms,
        }))
    }

    // == Count Records ==
    /// Total rows held for `operation`, across all dates.
    pub fn count_records(&self, operation: &str) -> Result<u64> {
        let count: i64 =
            db::with_transaction(&self.settings, TransactionBehavior::Deferred, |tx| {
                Ok(tx.query_row(
                    "SELECT COUNT(*) FROM cache WHERE operation_identity = ?1",
                    params![operation],
                    |row| row.get(0),
                )?)
            })?;
        Ok(count.max(0) as u64)
    }
}
