//! KV Store Module
//!
//! SQLite-backed blob store. Values written through [`KvStore::set`] are JSON;
//! [`KvStore::set_raw`] stores bytes verbatim.

use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::{self, SqliteSettings};
use crate::error::{MemoError, Result};
use crate::kv::{MAX_KEY_LENGTH, MAX_VALUE_SIZE};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL
);
";

// == Blob ==
/// Result of reading a key: the decoded value, or the bytes as stored when
/// they are not JSON of the requested type.
#[derive(Debug, Clone, PartialEq)]
pub enum Blob<T> {
    Decoded(T),
    Raw(Vec<u8>),
}

impl<T> Blob<T> {
    /// The decoded value, if decoding succeeded.
    pub fn decoded(self) -> Option<T> {
        match self {
            Blob::Decoded(value) => Some(value),
            Blob::Raw(_) => None,
        }
    }
}

// == KV Store ==
/// Handle to the `kv` table in one SQLite file. Holds no open connection.
#[derive(Debug, Clone)]
pub struct KvStore {
    settings: SqliteSettings,
}

impl KvStore {
    // == Constructor ==
    pub fn open(settings: SqliteSettings) -> Result<Self> {
        db::initialize(&settings, SCHEMA)?;
        Ok(Self { settings })
    }

    // == Set ==
    /// Stores `value` as JSON under `key`, replacing any previous value.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set_raw(key, &bytes)
    }

    // == Set Raw ==
    /// Stores `bytes` under `key` without encoding them.
    pub fn set_raw(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        if bytes.len() > MAX_VALUE_SIZE {
            return Err(MemoError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        db::with_transaction(&self.settings, TransactionBehavior::Immediate, |tx| {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, bytes],
            )?;
            Ok(())
        })
    }

    // == Get ==
    /// Reads `key`, decoding JSON into `T` when possible.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Blob<T>>> {
        Ok(self.get_bytes(key)?.map(decode))
    }

    /// Reads `key` as stored.
    pub fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        db::with_transaction(&self.settings, TransactionBehavior::Deferred, |tx| {
            Ok(tx
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    // == Delete ==
    /// Removes `key`. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let removed = db::with_transaction(&self.settings, TransactionBehavior::Immediate, |tx| {
            Ok(tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?)
        })?;
        Ok(removed > 0)
    }
}

fn decode<T: DeserializeOwned>(bytes: Vec<u8>) -> Blob<T> {
    match serde_json::from_slice(&bytes) {
        Ok(value) => Blob::Decoded(value),
        Err(_) => Blob::Raw(bytes),
    }
}

/// Checks a key against the store's limits: non-empty, at most
/// [`MAX_KEY_LENGTH`] bytes.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(MemoError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(MemoError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::{tempdir, TempDir};

    fn open_store() -> (TempDir, KvStore) {
        let dir = tempdir().unwrap();
        let store = KvStore::open(SqliteSettings::new(dir.path().join("kv.db"))).unwrap();
        (dir, store)
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Status {
        page: u32,
        done: bool,
    }

    #[test]
    fn test_set_and_get_structured() {
        let (_dir, store) = open_store();
        let status = Status { page: 4, done: false };

        store.set("crawler", &status).unwrap();

        let blob: Blob<Status> = store.get("crawler").unwrap().unwrap();
        assert_eq!(blob, Blob::Decoded(status));
    }

    #[test]
    fn test_get_missing() {
        let (_dir, store) = open_store();
        assert!(store.get::<u32>("nope").unwrap().is_none());
    }

    #[test]
    fn test_raw_bytes_fall_back() {
        let (_dir, store) = open_store();
        let bytes = vec![0xff, 0x00, 0x13];

        store.set_raw("image", &bytes).unwrap();

        let blob: Blob<Status> = store.get("image").unwrap().unwrap();
        assert_eq!(blob, Blob::Raw(bytes));
        assert!(blob.decoded().is_none());
    }

    #[test]
    fn test_wrong_type_falls_back_to_raw() {
        let (_dir, store) = open_store();
        store.set("n", &42).unwrap();

        let blob: Blob<Status> = store.get("n").unwrap().unwrap();
        assert_eq!(blob, Blob::Raw(b"42".to_vec()));
    }

    #[test]
    fn test_overwrite() {
        let (_dir, store) = open_store();
        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();

        let blob: Blob<String> = store.get("k").unwrap().unwrap();
        assert_eq!(blob.decoded().as_deref(), Some("second"));
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = open_store();
        store.set("k", &1).unwrap();

        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert!(store.get_bytes("k").unwrap().is_none());
    }

    #[test]
    fn test_key_validation() {
        let (_dir, store) = open_store();
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        assert!(matches!(
            store.set(&long_key, &1),
            Err(MemoError::InvalidRequest(_))
        ));
        assert!(matches!(store.get::<u32>(""), Err(MemoError::InvalidRequest(_))));
    }

    #[test]
    fn test_value_too_large() {
        let (_dir, store) = open_store();
        let large = vec![0u8; MAX_VALUE_SIZE + 1];

        let result = store.set_raw("big", &large);
        assert!(matches!(result, Err(MemoError::InvalidRequest(_))));
    }
}
