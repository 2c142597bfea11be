//! API Handlers
//!
//! HTTP request handlers for each inspection endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::inspection::Inspector;
use crate::models::{
    CacheStatsResponse, CancelRunResponse, ClearCacheResponse, HealthResponse, InspectRequest,
    RunAcceptedResponse,
};
use crate::quota::{QuotaLimits, QuotaSnapshot, QuotaTracker};
use crate::scheduler::{
    AbortReason, BatchScheduler, RunControl, RunRegistry, RunReport, RunStatus, SchedulerSettings,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<BatchScheduler>,
    /// Runs started through `POST /runs`
    pub runs: Arc<RunRegistry>,
}

impl AppState {
    /// Creates a new AppState around an existing scheduler.
    pub fn new(scheduler: BatchScheduler) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            runs: Arc::new(RunRegistry::new()),
        }
    }

    /// Wires cache, quota tracker and scheduler from configuration.
    pub fn from_config(
        config: &Config,
        inspector: Arc<dyn Inspector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(RwLock::new(CacheStore::new(config.cache_ttl(), clock.clone())));
        let limits = QuotaLimits {
            daily: config.daily_quota,
            per_minute: config.per_minute_quota,
        };
        let quota = Arc::new(QuotaTracker::new(limits, clock.clone()));
        let scheduler = BatchScheduler::new(
            cache,
            quota,
            inspector,
            clock,
            SchedulerSettings::from(config),
        );
        Self::new(scheduler)
    }

    pub fn cache(&self) -> Arc<RwLock<CacheStore>> {
        self.scheduler.cache().clone()
    }
}

/// Handler for POST /inspect
///
/// Runs a full inspection and returns the report. A run aborted on a
/// rejected credential answers 401 but still carries the completed work.
pub async fn inspect_handler(
    State(state): State<AppState>,
    Json(req): Json<InspectRequest>,
) -> Result<(StatusCode, Json<RunReport>)> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let report = state
        .scheduler
        .run(req.into(), &RunControl::default())
        .await;

    let status = match report.abort_reason {
        Some(AbortReason::AuthError { .. }) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(report)))
}

/// Handler for POST /runs
///
/// Starts the run in the background and answers immediately.
pub async fn start_run_handler(
    State(state): State<AppState>,
    Json(req): Json<InspectRequest>,
) -> Result<(StatusCode, Json<RunAcceptedResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let run_id = state.runs.track(state.scheduler.spawn(req.into()));
    info!("Run {} accepted", run_id);
    Ok((StatusCode::ACCEPTED, Json(RunAcceptedResponse::new(run_id))))
}

/// Handler for GET /runs/:id
///
/// Returns live progress, plus the report once the run has finished.
pub async fn run_status_handler(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunStatus>> {
    match state.runs.status(run_id) {
        Some(Ok(status)) => Ok(Json(status)),
        Some(Err(message)) => Err(ApiError::Internal(message)),
        None => Err(ApiError::NotFound(format!("Unknown run: {}", run_id))),
    }
}

/// Handler for DELETE /runs/:id
///
/// Cancellation takes effect at the next batch boundary or quota wait.
pub async fn cancel_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<CancelRunResponse>> {
    let cancelled = state
        .runs
        .cancel(run_id)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown run: {}", run_id)))?;
    if cancelled {
        info!("Run {} cancellation requested", run_id);
    }
    Ok(Json(CancelRunResponse { run_id, cancelled }))
}

/// Handler for GET /quota
pub async fn quota_handler(State(state): State<AppState>) -> Json<QuotaSnapshot> {
    Json(state.scheduler.quota().snapshot())
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    // Read lock is enough for stats
    let cache = state.scheduler.cache().read().await;
    Json(CacheStatsResponse::from(cache.stats()))
}

/// Handler for DELETE /cache
///
/// Drops all cached results so the next run re-inspects everything.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let cleared = state.scheduler.cache().write().await.clear();
    info!("Cache cleared: {} results dropped", cleared);
    Json(ClearCacheResponse::new(cleared))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
