//! API Routes
//!
//! Configures the Axum router with all inspection endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, cancel_run_handler, clear_cache_handler, health_handler, inspect_handler,
    quota_handler, run_status_handler, start_run_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /inspect` - Run a batch inspection
/// - `POST /runs` - Start a batch inspection in the background
/// - `GET /runs/:id` - Progress and, once finished, the report
/// - `DELETE /runs/:id` - Cancel a background run
/// - `GET /quota` - Current quota counters
/// - `GET /cache/stats` - Result cache statistics
/// - `DELETE /cache` - Drop all cached results
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/inspect", post(inspect_handler))
        .route("/runs", post(start_run_handler))
        .route("/runs/:id", get(run_status_handler).delete(cancel_run_handler))
        .route("/quota", get(quota_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
