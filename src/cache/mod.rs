//! Cache Module
//!
//! Session-scoped result cache keyed by inspection fingerprint, with
//! lazy TTL expiry and an optional eager sweep.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Default lifetime of a cached result in hours
pub const DEFAULT_TTL_HOURS: u64 = 24;
