//! API Handlers
//!
//! HTTP request handlers for each inspection endpoint. Storage calls are
//! blocking, so each one runs on tokio's blocking pool.

use std::path::Path as FsPath;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::config::Config;
use crate::db::{run_blocking, SqliteSettings};
use crate::error::{MemoError, Result};
use crate::kv::KvStore;
use crate::memo::{CallTime, Fingerprint, Invoker, RecordStore};
use crate::models::{
    DeleteResponse, HealthResponse, KvGetResponse, KvSetRequest, KvSetResponse, RecordResponse,
    UsageQuery, UsageResponse,
};

/// Application state shared across all handlers.
///
/// Store handles hold no connection, so cloning the state per request is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Invoker over the record store; also the source of today's date
    pub invoker: Invoker,
    /// Blob store
    pub kv: KvStore,
    /// Limit reported by /usage when the query gives none
    pub default_max_calls: u32,
}

impl AppState {
    /// Creates a new AppState from already-opened handles.
    pub fn new(invoker: Invoker, kv: KvStore, default_max_calls: u32) -> Self {
        Self {
            invoker,
            kv,
            default_max_calls,
        }
    }

    /// Opens both stores with default connection settings.
    pub fn open(
        memo_path: impl AsRef<FsPath>,
        kv_path: impl AsRef<FsPath>,
        default_max_calls: u32,
    ) -> Result<Self> {
        let records = RecordStore::open(SqliteSettings::new(memo_path))?;
        let kv = KvStore::open(SqliteSettings::new(kv_path))?;
        Ok(Self::new(Invoker::new(records), kv, default_max_calls))
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let records = RecordStore::open(
            SqliteSettings::new(&config.memo_db_path).busy_timeout_ms(config.busy_timeout_ms),
        )?;
        let kv = KvStore::open(
            SqliteSettings::new(&config.kv_db_path).busy_timeout_ms(config.busy_timeout_ms),
        )?;
        let invoker = Invoker::new(records).strict_writes(config.strict_writes);
        Ok(Self::new(invoker, kv, config.max_calls_per_day))
    }
}

/// Handler for GET /usage/:operation
///
/// Reports today's record count for an operation against its daily limit.
pub async fn usage_handler(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>> {
    let max_calls = query.max_calls.unwrap_or(state.default_max_calls);
    let date = CallTime::read(state.invoker.clock()).date;

    let quota = state.invoker.quota().clone();
    let op = operation.clone();
    let usage = run_blocking(move || quota.usage(&op, date, max_calls)).await?;

    Ok(Json(UsageResponse::new(operation, date, usage)))
}

/// Handler for GET /records/:operation/:fingerprint
///
/// Returns the stored audit row for one call.
pub async fn record_handler(
    State(state): State<AppState>,
    Path((operation, fingerprint)): Path<(String, String)>,
) -> Result<Json<RecordResponse>> {
    let fingerprint = Fingerprint::parse(&fingerprint)?;

    let store = state.invoker.store().clone();
    let op = operation.clone();
    let fp = fingerprint.clone();
    let record = run_blocking(move || store.fetch(&op, &fp)).await?;

    record
        .map(|record| Json(RecordResponse::from(record)))
        .ok_or_else(|| MemoError::NotFound(format!("{operation}/{fingerprint}")))
}

/// Handler for GET /kv/:key
pub async fn kv_get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<KvGetResponse>> {
    let kv = state.kv.clone();
    let lookup_key = key.clone();
    let blob = run_blocking(move || kv.get::<Value>(&lookup_key)).await?;

    match blob {
        Some(blob) => Ok(Json(KvGetResponse::new(key, blob))),
        None => Err(MemoError::NotFound(key)),
    }
}

/// Handler for PUT /kv
pub async fn kv_set_handler(
    State(state): State<AppState>,
    Json(req): Json<KvSetRequest>,
) -> Result<Json<KvSetResponse>> {
    req.validate()?;

    let kv = state.kv.clone();
    let KvSetRequest { key, value } = req;
    let stored_key = key.clone();
    run_blocking(move || kv.set(&stored_key, &value)).await?;

    Ok(Json(KvSetResponse::new(key)))
}

/// Handler for DELETE /kv/:key
pub async fn kv_delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let kv = state.kv.clone();
    let delete_key = key.clone();
    let existed = run_blocking(move || kv.delete(&delete_key)).await?;

    if existed {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(MemoError::NotFound(key))
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
