//! SQLite Connection Module
//!
//! Every store operation opens its own connection and transaction and drops
//! both before returning, so no connection outlives a single call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::{MemoError, Result};

/// Default wait on a locked database before giving up
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

// == SQLite Settings ==
/// Location and locking behaviour of one backing database file.
#[derive(Debug, Clone)]
pub struct SqliteSettings {
    /// Database file path
    pub path: PathBuf,
    /// How long a connection waits on a lock held by another connection
    pub busy_timeout: Duration,
}

impl SqliteSettings {
    /// Creates settings for `path` with the default busy timeout.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Overrides the busy timeout.
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout = Duration::from_millis(ms);
        self
    }
}

// == Open Connection ==
/// Opens a fresh read-write connection, creating the file if needed.
pub fn open_connection(settings: &SqliteSettings) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(&settings.path, flags).map_err(|err| {
        MemoError::Storage(format!(
            "unable to open {}: {}",
            settings.path.display(),
            err
        ))
    })?;
    conn.busy_timeout(settings.busy_timeout)?;
    Ok(conn)
}

// == Initialize ==
/// Switches the file to WAL and applies `schema` inside one transaction.
///
/// WAL is persistent per file, so this only needs to run once per process.
pub fn initialize(settings: &SqliteSettings, schema: &str) -> Result<()> {
    let mut conn = open_connection(settings)?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("journal_mode={mode} for {}", settings.path.display());
    let tx = conn.transaction()?;
    tx.execute_batch(schema)?;
    tx.commit()?;
    debug!("initialized database at {}", settings.path.display());
    Ok(())
}

// == Scoped Transaction ==
/// Runs `f` inside a transaction on a connection opened for this call alone.
///
/// The transaction commits only if `f` succeeds. On any error the transaction
/// is rolled back and the connection closed when both drop.
pub fn with_transaction<T, F>(
    settings: &SqliteSettings,
    behavior: TransactionBehavior,
    f: F,
) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let mut conn = open_connection(settings)?;
    let tx = conn.transaction_with_behavior(behavior)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

// == Run Blocking ==
/// Moves a blocking storage call onto tokio's blocking pool.
pub async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| MemoError::Storage(format!("blocking task failed: {err}")))?
}
