//! API Routes
//!
//! Configures the Axum router with all inspection endpoints.

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, kv_delete_handler, kv_get_handler, kv_set_handler, record_handler,
    usage_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/usage/:operation", get(usage_handler))
        .route("/records/:operation/:fingerprint", get(record_handler))
        .route("/kv", put(kv_set_handler))
        .route("/kv/:key", get(kv_get_handler).delete(kv_delete_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
