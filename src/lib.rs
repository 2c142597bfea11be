//! URL Inspector - quota-aware batch URL inspection
//!
//! Inspects large URL lists against the Search Console URL Inspection API
//! within daily and per-minute quotas, caching results for a day.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod inspection;
pub mod models;
pub mod quota;
pub mod scheduler;
pub mod tasks;

#[cfg(test)]
mod test_support;

pub use api::AppState;
pub use config::Config;
pub use scheduler::{BatchScheduler, RunReport, RunRequest};
pub use tasks::spawn_cleanup_task;
