//! Quota Memo - persistent memoization with a daily call quota
//!
//! Wraps expensive or rate-limited operations so that identical calls are
//! answered from a SQLite-backed record store, fresh calls are capped per
//! calendar day, and every fresh call is recorded for auditing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod memo;
pub mod models;
pub mod timing;

pub use api::AppState;
pub use config::Config;
pub use error::{InvokeError, MemoError};
pub use memo::{Delivery, Invoker, RecordStore};
