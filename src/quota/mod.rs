//! Quota Module
//!
//! Daily and per-minute admission control for remote inspection calls.

mod tracker;

#[cfg(test)]
mod property_tests;

pub use tracker::{next_midnight, Admission, DenyReason, QuotaLimits, QuotaSnapshot, QuotaTracker};

// == Public Constants ==
/// Remote calls allowed per UTC day
pub const DEFAULT_DAILY_QUOTA: u32 = 2000;

/// Remote calls allowed per 60-second window
pub const DEFAULT_PER_MINUTE_QUOTA: u32 = 600;

/// Length of the short quota window in seconds
pub const MINUTE_WINDOW_SECS: i64 = 60;
