//! Cache Store Module
//!
//! Maps inspection fingerprints to their last fetched result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::Clock;
use crate::inspection::{Fingerprint, InspectionResult, Source};

// == Cache Store ==
/// In-memory result cache with a fixed TTL measured from fetch time.
pub struct CacheStore {
    /// Fingerprint-keyed storage
    entries: HashMap<Fingerprint, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Lifetime of every entry
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store whose entries live for `ttl`.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(52 * 100)),
            clock,
        }
    }

    // == Get ==
    /// Returns the cached result tagged [`Source::Cached`] if it is still fresh.
    ///
    /// Expired entries are removed and reported as absent.
    pub fn get(&mut self, key: &Fingerprint) -> Option<InspectionResult> {
        let now = self.clock.now();

        let fresh = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.result.with_source(Source::Cached)),
            Some(_) => {
                self.entries.remove(key);
                self.stats.record_expired(1);
                self.stats.set_total_entries(self.entries.len());
                None
            }
            None => None,
        };

        if fresh.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        fresh
    }

    // == Put ==
    /// Stores `result` under `key`, replacing any previous entry.
    pub fn put(&mut self, key: Fingerprint, result: InspectionResult) {
        let entry = CacheEntry::new(result, self.ttl);
        self.entries.insert(key, entry);
        self.stats.record_write();
        self.stats.set_total_entries(self.entries.len());
    }

    // == Clear ==
    /// Drops every entry and returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.stats.set_total_entries(0);
        count
    }

    // == Purge Expired ==
    /// Removes all expired entries and returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let removed = before - self.entries.len();
        self.stats.record_expired(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
