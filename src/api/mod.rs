//! API Module
//!
//! HTTP handlers and routing for inspecting the record store and
//! reading/writing the blob store.
//!
//! # Endpoints
//! - `GET /usage/:operation` - Today's call count against the daily limit
//! - `GET /records/:operation/:fingerprint` - Audit row for one call
//! - `GET /kv/:key` - Read a blob
//! - `PUT /kv` - Store a JSON blob
//! - `DELETE /kv/:key` - Delete a blob
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
