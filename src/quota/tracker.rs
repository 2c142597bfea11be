//! Quota Tracker Module
//!
//! Process-wide admission control against a daily and a per-minute ceiling.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::quota::{DEFAULT_DAILY_QUOTA, DEFAULT_PER_MINUTE_QUOTA, MINUTE_WINDOW_SECS};

// == Deny Reason ==
/// Which ceiling refused an admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    DailyExhausted,
    MinuteExhausted,
}

// == Admission ==
/// Outcome of [`QuotaTracker::try_admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Denied {
        reason: DenyReason,
        retry_after: Duration,
    },
}

// == Limits ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub daily: u32,
    pub per_minute: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            daily: DEFAULT_DAILY_QUOTA,
            per_minute: DEFAULT_PER_MINUTE_QUOTA,
        }
    }
}

// == Snapshot ==
/// Read-only view of the counters, as of the time it was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub daily_count: u32,
    pub daily_limit: u32,
    pub daily_reset_at: DateTime<Utc>,
    pub minute_count: u32,
    pub per_minute_limit: u32,
    pub minute_window_start: DateTime<Utc>,
}

#[derive(Debug)]
struct QuotaState {
    daily_count: u32,
    daily_reset_at: DateTime<Utc>,
    minute_count: u32,
    minute_window_start: DateTime<Utc>,
}

impl QuotaState {
    fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            daily_count: 0,
            daily_reset_at: next_midnight(now),
            minute_count: 0,
            minute_window_start: now,
        }
    }

    /// Applies any window boundary crossed by `now`.
    fn roll(&mut self, now: DateTime<Utc>) {
        if now >= self.daily_reset_at {
            self.daily_count = 0;
            self.daily_reset_at = next_midnight(now);
        }
        if now - self.minute_window_start >= minute_window() {
            self.minute_count = 0;
            self.minute_window_start = now;
        }
    }
}

// == Quota Tracker ==
/// Counts remote calls and decides whether another may start.
///
/// Counters live only as long as the process and start at zero.
pub struct QuotaTracker {
    state: Mutex<QuotaState>,
    limits: QuotaLimits,
    clock: Arc<dyn Clock>,
}

impl QuotaTracker {
    pub fn new(limits: QuotaLimits, clock: Arc<dyn Clock>) -> Self {
        let state = QuotaState::starting_at(clock.now());
        Self {
            state: Mutex::new(state),
            limits,
            clock,
        }
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    // == Try Admit ==
    /// Admits one call and counts it, or explains how long to wait.
    ///
    /// The boundary check and the increment happen under one lock.
    pub fn try_admit(&self) -> Admission {
        let now = self.clock.now();
        let mut state = self.lock();
        state.roll(now);

        if state.daily_count >= self.limits.daily {
            let retry_after = to_std(state.daily_reset_at - now);
            debug!("Daily quota exhausted, resets in {:?}", retry_after);
            return Admission::Denied {
                reason: DenyReason::DailyExhausted,
                retry_after,
            };
        }

        if state.minute_count >= self.limits.per_minute {
            let retry_after = to_std(minute_window() - (now - state.minute_window_start));
            debug!("Per-minute quota exhausted, window reopens in {:?}", retry_after);
            return Admission::Denied {
                reason: DenyReason::MinuteExhausted,
                retry_after,
            };
        }

        state.daily_count += 1;
        state.minute_count += 1;
        Admission::Admitted
    }

    // == Snapshot ==
    /// Current counters with elapsed windows shown as reset.
    pub fn snapshot(&self) -> QuotaSnapshot {
        let now = self.clock.now();
        let state = self.lock();

        let (daily_count, daily_reset_at) = if now >= state.daily_reset_at {
            (0, next_midnight(now))
        } else {
            (state.daily_count, state.daily_reset_at)
        };
        let (minute_count, minute_window_start) =
            if now - state.minute_window_start >= minute_window() {
                (0, now)
            } else {
                (state.minute_count, state.minute_window_start)
            };

        QuotaSnapshot {
            daily_count,
            daily_limit: self.limits.daily,
            daily_reset_at,
            minute_count,
            per_minute_limit: self.limits.per_minute,
            minute_window_start,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QuotaState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// First UTC midnight strictly after `now`.
pub fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn minute_window() -> chrono::Duration {
    chrono::Duration::seconds(MINUTE_WINDOW_SECS)
}

fn to_std(delta: chrono::Duration) -> Duration {
    delta.to_std().unwrap_or(Duration::ZERO)
}
