//! Configuration Module
//!
//! Handles loading and managing engine configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_TTL_HOURS;
use crate::quota::{DEFAULT_DAILY_QUOTA, DEFAULT_PER_MINUTE_QUOTA};

/// Engine and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of live inspections per batch
    pub batch_size: usize,
    /// Pause between two live batches in seconds
    pub inter_batch_delay_secs: u64,
    /// Lifetime of a cached inspection result in hours
    pub cache_ttl_hours: u64,
    /// Maximum remote calls per day
    pub daily_quota: u32,
    /// Maximum remote calls per 60-second window
    pub per_minute_quota: u32,
    /// Retries after the first attempt for transient errors
    pub max_retries: u32,
    /// Longest admission wait before the remaining queue is abandoned
    pub max_admission_wait_secs: u64,
    /// Base delay for exponential retry backoff in milliseconds
    pub retry_base_delay_ms: u64,
    /// Upper bound on a single inspection call in seconds
    pub request_timeout_secs: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background cache sweep interval in seconds
    pub cleanup_interval: u64,
    /// Base URL of the inspection API
    pub api_base_url: String,
    /// Language code sent with every inspection
    pub language_code: String,
    /// Pre-exchanged bearer token
    pub access_token: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `BATCH_SIZE` (default: 10, minimum 1)
    /// - `INTER_BATCH_DELAY_SECS` (default: 5)
    /// - `CACHE_TTL_HOURS` (default: 24)
    /// - `DAILY_QUOTA` (default: 2000)
    /// - `PER_MINUTE_QUOTA` (default: 600)
    /// - `MAX_RETRIES` (default: 2)
    /// - `MAX_ADMISSION_WAIT_SECS` (default: 120)
    /// - `RETRY_BASE_DELAY_MS` (default: 1000)
    /// - `REQUEST_TIMEOUT_SECS` (default: 30)
    /// - `SERVER_PORT` (default: 3000)
    /// - `CLEANUP_INTERVAL` (default: 300)
    /// - `API_BASE_URL` (default: `https://searchconsole.googleapis.com`)
    /// - `LANGUAGE_CODE` (default: `en-US`)
    /// - `GSC_ACCESS_TOKEN` (no default)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_or("BATCH_SIZE", defaults.batch_size).max(1),
            inter_batch_delay_secs: env_or("INTER_BATCH_DELAY_SECS", defaults.inter_batch_delay_secs),
            cache_ttl_hours: env_or("CACHE_TTL_HOURS", defaults.cache_ttl_hours),
            daily_quota: env_or("DAILY_QUOTA", defaults.daily_quota),
            per_minute_quota: env_or("PER_MINUTE_QUOTA", defaults.per_minute_quota),
            max_retries: env_or("MAX_RETRIES", defaults.max_retries),
            max_admission_wait_secs: env_or("MAX_ADMISSION_WAIT_SECS", defaults.max_admission_wait_secs),
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            language_code: env::var("LANGUAGE_CODE").unwrap_or(defaults.language_code),
            access_token: env::var("GSC_ACCESS_TOKEN").ok().filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_secs(self.inter_batch_delay_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(3600))
    }

    pub fn max_admission_wait(&self) -> Duration {
        Duration::from_secs(self.max_admission_wait_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 10,
            inter_batch_delay_secs: 5,
            cache_ttl_hours: DEFAULT_TTL_HOURS,
            daily_quota: DEFAULT_DAILY_QUOTA,
            per_minute_quota: DEFAULT_PER_MINUTE_QUOTA,
            max_retries: 2,
            max_admission_wait_secs: 120,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 30,
            server_port: 3000,
            cleanup_interval: 300,
            api_base_url: "https://searchconsole.googleapis.com".to_string(),
            language_code: "en-US".to_string(),
            access_token: None,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
