//! Retry policy for per-URL failures.

use std::time::Duration;

use crate::config::Config;
use crate::error::InspectError;

/// Retries granted once the remote side reports throttling
pub const RATE_LIMIT_RETRIES: u32 = 1;

/// Longest computed backoff between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retries a single URL has already been granted, counted per error class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetriesUsed {
    pub transient: u32,
    pub rate_limited: u32,
}

impl RetriesUsed {
    /// Counts a granted retry against the class of `error`.
    pub fn record(&mut self, error: &InspectError) {
        match error {
            InspectError::RateLimited { .. } => self.rate_limited += 1,
            _ => self.transient += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.transient + self.rate_limited
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

// == Retry Policy ==
/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (zero-based): `base * 2^retry`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Decides what to do after `error`, given the retries this URL already used.
    ///
    /// Transient and rate-limited retries draw on separate allowances.
    pub fn decide(&self, error: &InspectError, used: &RetriesUsed) -> RetryDecision {
        match error {
            InspectError::Transient(_) if used.transient < self.max_retries => {
                RetryDecision::RetryAfter(self.backoff(used.transient))
            }
            InspectError::RateLimited { retry_after, .. }
                if used.rate_limited < RATE_LIMIT_RETRIES =>
            {
                RetryDecision::RetryAfter(
                    retry_after
                        .unwrap_or_else(|| self.backoff(used.rate_limited))
                        .min(MAX_BACKOFF),
                )
            }
            _ => RetryDecision::GiveUp,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self::new(config.max_retries, config.retry_base_delay())
    }
}
