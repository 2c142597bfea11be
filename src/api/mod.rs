//! API Module
//!
//! HTTP handlers and routing for the inspection REST API.
//!
//! # Endpoints
//! - `POST /inspect` - Run a batch inspection
//! - `POST /runs`, `GET /runs/:id`, `DELETE /runs/:id` - Background runs
//! - `GET /quota` - Current quota counters
//! - `GET /cache/stats` - Result cache statistics
//! - `DELETE /cache` - Drop all cached results
//! - `GET /health` - Health check endpoint

mod handlers;
mod routes;

pub use handlers::AppState;
pub use routes::create_router;
