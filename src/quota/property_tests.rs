//! Property-Based Tests for the Quota Tracker
//!
//! Simulates admission requests under a controlled clock and checks that
//! neither ceiling is ever exceeded.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::ManualClock;
use crate::quota::{Admission, DenyReason, QuotaLimits, QuotaTracker};
use crate::test_support::t0;

/// Clock steps in milliseconds, mostly bursts with occasional pauses
fn step_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        8 => Just(0u64),
        1 => 0u64..120_000,
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Default ceilings hold for any pattern of requests and clock steps.
    #[test]
    fn prop_ceilings_never_exceeded(steps in prop::collection::vec(step_strategy(), 1..4_000)) {
        let clock = Arc::new(ManualClock::new(t0()));
        let tracker = QuotaTracker::new(QuotaLimits::default(), clock.clone());
        let mut per_window: HashMap<DateTime<Utc>, u32> = HashMap::new();
        let mut per_day: HashMap<DateTime<Utc>, u32> = HashMap::new();

        for step_ms in steps {
            clock.advance(Duration::from_millis(step_ms));
            if tracker.try_admit() == Admission::Admitted {
                let snapshot = tracker.snapshot();
                *per_window.entry(snapshot.minute_window_start).or_default() += 1;
                *per_day.entry(snapshot.daily_reset_at).or_default() += 1;
                prop_assert!(snapshot.minute_count <= 600);
                prop_assert!(snapshot.daily_count <= 2000);
            }
        }

        prop_assert!(per_window.values().all(|&n| n <= 600));
        prop_assert!(per_day.values().all(|&n| n <= 2000));
    }

    // With small ceilings, denials always carry a wait that reaches the next boundary.
    #[test]
    fn prop_retry_after_reaches_boundary(
        daily in 1u32..20,
        per_minute in 1u32..10,
        steps in prop::collection::vec(0u64..90, 1..200)
    ) {
        let clock = Arc::new(ManualClock::new(t0()));
        let tracker = QuotaTracker::new(QuotaLimits { daily, per_minute }, clock.clone());

        for step_secs in steps {
            clock.advance(Duration::from_secs(step_secs));
            if let Admission::Denied { reason, retry_after } = tracker.try_admit() {
                let before = tracker.snapshot();
                clock.advance(retry_after);
                let after = tracker.snapshot();
                match reason {
                    DenyReason::MinuteExhausted => {
                        prop_assert!(retry_after <= Duration::from_secs(60));
                        prop_assert_eq!(after.minute_count, 0);
                    }
                    DenyReason::DailyExhausted => {
                        prop_assert!(after.daily_reset_at > before.daily_reset_at);
                        prop_assert_eq!(after.daily_count, 0);
                    }
                }
            }
        }
    }
}
