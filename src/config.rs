//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::memo::DEFAULT_MAX_CALLS;

/// Process configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file holding memoized call records
    pub memo_db_path: PathBuf,
    /// SQLite file holding the key/value blob store
    pub kv_db_path: PathBuf,
    /// Default daily call limit per operation
    pub max_calls_per_day: u32,
    /// How long a connection waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
    /// Surface record-write failures instead of the computed outcome
    pub strict_writes: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Optional log file, in addition to stdout
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMO_DB_PATH` - Record store file (default: function_cache.db)
    /// - `KV_DB_PATH` - Blob store file (default: kv_cache.db)
    /// - `MAX_CALLS_PER_DAY` - Default daily quota (default: 99)
    /// - `SQLITE_BUSY_TIMEOUT_MS` - Busy timeout (default: 5000)
    /// - `STRICT_RECORD_WRITES` - `true`/`1` to fail calls whose record write fails (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `LOG_FILE` - Also write logs to this file (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memo_db_path: env::var("MEMO_DB_PATH")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.memo_db_path),
            kv_db_path: env::var("KV_DB_PATH")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.kv_db_path),
            max_calls_per_day: env::var("MAX_CALLS_PER_DAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_calls_per_day),
            busy_timeout_ms: env::var("SQLITE_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.busy_timeout_ms),
            strict_writes: env::var("STRICT_RECORD_WRITES")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.strict_writes),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            log_file: env::var("LOG_FILE")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memo_db_path: PathBuf::from("function_cache.db"),
            kv_db_path: PathBuf::from("kv_cache.db"),
            max_calls_per_day: DEFAULT_MAX_CALLS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            strict_writes: false,
            server_port: 3000,
            log_file: None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
