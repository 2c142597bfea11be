//! Response DTOs for the inspection API
//!
//! Defines the structure of outgoing HTTP response bodies. Run reports and
//! quota snapshots are serialized directly.

use serde::Serialize;
use uuid::Uuid;

use crate::cache::CacheStats;

/// Response body for `GET /cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub writes: u64,
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            writes: stats.writes,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub message: String,
    pub cleared: usize,
}

impl ClearCacheResponse {
    pub fn new(cleared: usize) -> Self {
        Self {
            message: format!("Cleared {} cached results", cleared),
            cleared,
        }
    }
}

/// Response body for `POST /runs`
#[derive(Debug, Clone, Serialize)]
pub struct RunAcceptedResponse {
    pub run_id: Uuid,
    /// Where to poll for progress and the final report
    pub status_url: String,
}

impl RunAcceptedResponse {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            status_url: format!("/runs/{}", run_id),
        }
    }
}

/// Response body for `DELETE /runs/:id`
#[derive(Debug, Clone, Serialize)]
pub struct CancelRunResponse {
    pub run_id: Uuid,
    /// False when the run had already finished
    pub cancelled: bool,
}

/// Response body for the health check endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status
    pub status: String,
}

impl HealthResponse {
    /// Creates a healthy response
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 1,
            misses: 3,
            expired: 0,
            writes: 4,
            total_entries: 4,
        };
        let response = CacheStatsResponse::from(stats);
        assert_eq!(response.hit_rate, 0.25);
        assert_eq!(response.writes, 4);
    }

    #[test]
    fn test_clear_cache_response() {
        let response = ClearCacheResponse::new(3);
        assert_eq!(response.cleared, 3);
        assert!(response.message.contains('3'));
    }

    #[test]
    fn test_run_accepted_points_at_status() {
        let run_id = Uuid::new_v4();
        let response = RunAcceptedResponse::new(run_id);
        assert_eq!(response.status_url, format!("/runs/{run_id}"));
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
    }
}
