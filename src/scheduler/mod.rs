//! Scheduler Module
//!
//! Quota-aware batch inspection runs.
//!
//! A run deduplicates its input, serves fresh cache entries, then works
//! through the remaining URLs in batches, asking the quota tracker before
//! every remote call and retrying retryable failures with backoff.

mod batch;
mod progress;
mod registry;
mod report;
mod retry;


pub use batch::{BatchScheduler, SchedulerSettings};
pub use progress::{RunControl, RunHandle, RunProgress, RunState};
pub use registry::{RunRegistry, RunStatus, MAX_FINISHED_RUNS};
pub use report::{
    AbortReason, FailureRecord, RunReport, RunRequest, RunSummary, MAX_BATCH_SIZE,
    MAX_INTER_BATCH_DELAY_SECS,
};
pub use retry::{RetriesUsed, RetryDecision, RetryPolicy, MAX_BACKOFF, RATE_LIMIT_RETRIES};
