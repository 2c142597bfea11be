//! Cache Entry Module
//!
//! A stored inspection result together with its expiry instant.

use chrono::{DateTime, Duration, Utc};

use crate::inspection::InspectionResult;

// == Cache Entry ==
/// Represents a single cached inspection.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored result, as fetched
    pub result: InspectionResult,
    /// `result.fetched_at + ttl`
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` after the result was fetched.
    pub fn new(result: InspectionResult, ttl: Duration) -> Self {
        let expires_at = result
            .fetched_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { result, expires_at }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now`.
    ///
    /// The entry is still served at exactly `expires_at` and expires strictly after it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
