//! Run request and final report types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::inspection::{InspectionResult, Source};
use crate::quota::DenyReason;
use crate::scheduler::RunState;

/// Largest batch a single run may ask for
pub const MAX_BATCH_SIZE: usize = 100;

/// Longest inter-batch pause a single run may ask for
pub const MAX_INTER_BATCH_DELAY_SECS: u64 = 60;

// == Run Request ==
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub property: String,
    pub urls: Vec<String>,
    /// Skip cache reads; fresh results are still written back
    #[serde(default)]
    pub force_refresh: bool,
    /// Per-run batch size, clamped to `1..=MAX_BATCH_SIZE`
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Per-run inter-batch pause, capped at `MAX_INTER_BATCH_DELAY_SECS`
    #[serde(default)]
    pub inter_batch_delay_secs: Option<u64>,
}

impl RunRequest {
    pub fn new(property: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            property: property.into(),
            urls,
            force_refresh: false,
            batch_size: None,
            inter_batch_delay_secs: None,
        }
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn inter_batch_delay_secs(mut self, secs: Option<u64>) -> Self {
        self.inter_batch_delay_secs = secs;
        self
    }
}

// == Failure Record ==
/// A URL that was attempted and did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub url: String,
    pub kind: ErrorKind,
    pub message: String,
    /// Remote calls made for this URL
    pub attempts: u32,
}

// == Abort Reason ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortReason {
    AuthError {
        message: String,
    },
    QuotaExceeded {
        reason: DenyReason,
        retry_after_secs: u64,
    },
    Cancelled,
}

impl AbortReason {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AbortReason::AuthError { .. } => Some(ErrorKind::AuthError),
            AbortReason::QuotaExceeded { .. } => Some(ErrorKind::QuotaExceeded),
            AbortReason::Cancelled => None,
        }
    }
}

// == Run Summary ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_attempted: usize,
    pub cached: usize,
    pub live: usize,
    pub indexed: usize,
}

// == Run Report ==
/// Terminal outcome of a run. Completed work is kept even when aborted.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub property: String,
    pub state: RunState,
    pub results: Vec<InspectionResult>,
    pub failures: BTreeMap<String, FailureRecord>,
    pub not_attempted: Vec<String>,
    pub aborted: bool,
    pub abort_reason: Option<AbortReason>,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn summarize(
        results: &[InspectionResult],
        failures: &BTreeMap<String, FailureRecord>,
        not_attempted: &[String],
    ) -> RunSummary {
        let cached = results.iter().filter(|r| r.source == Source::Cached).count();
        RunSummary {
            total: results.len() + failures.len() + not_attempted.len(),
            succeeded: results.len(),
            failed: failures.len(),
            not_attempted: not_attempted.len(),
            cached,
            live: results.len() - cached,
            indexed: results.iter().filter(|r| r.is_indexed()).count(),
        }
    }

    /// URLs worth submitting again: retryable failures plus everything not attempted.
    pub fn retry_candidates(&self) -> Vec<String> {
        self.failures
            .values()
            .filter(|f| f.kind.is_retryable())
            .map(|f| f.url.clone())
            .chain(self.not_attempted.iter().cloned())
            .collect()
    }
}
