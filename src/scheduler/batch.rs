//! Batch Scheduler
//!
//! Drives a run from raw input URLs to a [`RunReport`]: dedup, cache
//! read-through, quota admission, remote calls with retry, write-back.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::InspectError;
use crate::inspection::{normalize, Fingerprint, InspectionResult, Inspector, Source};
use crate::quota::{Admission, QuotaTracker};
use crate::scheduler::{
    AbortReason, FailureRecord, RetriesUsed, RetryDecision, RetryPolicy, RunControl, RunHandle,
    RunProgress, RunReport, RunRequest, RunState, MAX_BATCH_SIZE, MAX_INTER_BATCH_DELAY_SECS,
};

// == Settings ==
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    pub max_admission_wait: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            inter_batch_delay: config.inter_batch_delay(),
            max_admission_wait: config.max_admission_wait(),
            request_timeout: config.request_timeout(),
            retry: RetryPolicy::from(config),
        }
    }
}

impl SchedulerSettings {
    /// These settings with a run's batch overrides applied and clamped.
    pub fn for_request(&self, request: &RunRequest) -> Self {
        let mut settings = self.clone();
        if let Some(batch_size) = request.batch_size {
            settings.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        }
        if let Some(secs) = request.inter_batch_delay_secs {
            settings.inter_batch_delay = Duration::from_secs(secs.min(MAX_INTER_BATCH_DELAY_SECS));
        }
        settings
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// A deduplicated URL waiting for a live call.
#[derive(Debug, Clone)]
struct Job {
    fingerprint: Fingerprint,
    target: String,
}

enum Planned {
    Job(Job),
    Invalid { url: String, error: InspectError },
}

enum JobOutcome {
    Done(InspectionResult),
    Failed(FailureRecord),
    Abort(AbortReason),
}

// == Ledger ==
/// Accumulates a run's outcome and mirrors it into progress updates.
struct Ledger<'a> {
    control: &'a RunControl,
    progress: RunProgress,
    results: Vec<InspectionResult>,
    failures: BTreeMap<String, FailureRecord>,
    not_attempted: Vec<String>,
}

impl<'a> Ledger<'a> {
    fn new(control: &'a RunControl, total: usize) -> Self {
        let mut progress = RunProgress::pending();
        progress.total = total;
        progress.state = RunState::Running;
        control.publish(&progress);

        Self {
            control,
            progress,
            results: Vec::with_capacity(total),
            failures: BTreeMap::new(),
            not_attempted: Vec::new(),
        }
    }

    fn working_on(&mut self, url: &str) {
        self.progress.current_url = Some(url.to_string());
        self.control.publish(&self.progress);
    }

    fn record_result(&mut self, result: InspectionResult) {
        match result.source {
            Source::Cached => self.progress.cached += 1,
            Source::Live => self.progress.live += 1,
        }
        self.progress.completed += 1;
        self.progress.current_url = Some(result.url.clone());
        self.results.push(result);
        self.control.publish(&self.progress);
    }

    fn record_failure(&mut self, failure: FailureRecord) {
        self.progress.completed += 1;
        self.progress.failed += 1;
        self.progress.current_url = Some(failure.url.clone());
        self.failures.insert(failure.url.clone(), failure);
        self.control.publish(&self.progress);
    }
}

// == Batch Scheduler ==
pub struct BatchScheduler {
    cache: Arc<RwLock<CacheStore>>,
    quota: Arc<QuotaTracker>,
    inspector: Arc<dyn Inspector>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
}

impl BatchScheduler {
    pub fn new(
        cache: Arc<RwLock<CacheStore>>,
        quota: Arc<QuotaTracker>,
        inspector: Arc<dyn Inspector>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            cache,
            quota,
            inspector,
            clock,
            settings,
        }
    }

    pub fn cache(&self) -> &Arc<RwLock<CacheStore>> {
        &self.cache
    }

    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Starts `request` on a new task. The handle's `run_id` matches the report's.
    pub fn spawn(self: &Arc<Self>, request: RunRequest) -> RunHandle {
        let run_id = Uuid::new_v4();
        let (control, progress) = RunControl::new();
        let cancel = control.cancel_token();
        let scheduler = Arc::clone(self);
        let join = tokio::spawn(async move { scheduler.execute(run_id, request, &control).await });

        RunHandle {
            run_id,
            progress,
            cancel,
            join,
        }
    }

    // == Run ==
    /// Executes a full run. Per-URL errors land in `failures`; an auth
    /// failure, an over-long quota wait or cancellation ends the run early
    /// with the unprocessed URLs listed in `not_attempted`.
    pub async fn run(&self, request: RunRequest, control: &RunControl) -> RunReport {
        self.execute(Uuid::new_v4(), request, control).await
    }

    async fn execute(&self, run_id: Uuid, request: RunRequest, control: &RunControl) -> RunReport {
        let started_at = self.clock.now();
        let property = request.property.trim().to_string();

        let planned = plan(&property, &request.urls);
        info!(
            "Run {} started: {} unique URLs for {} ({} submitted)",
            run_id,
            planned.len(),
            property,
            request.urls.len()
        );

        let mut ledger = Ledger::new(control, planned.len());
        let mut queue = Vec::new();

        for item in planned {
            match item {
                Planned::Invalid { url, error } => {
                    debug!("Rejected {}: {}", url, error);
                    ledger.record_failure(FailureRecord {
                        url,
                        kind: error.kind(),
                        message: error.to_string(),
                        attempts: 0,
                    });
                }
                Planned::Job(job) => {
                    let cached = if request.force_refresh {
                        None
                    } else {
                        self.cache.write().await.get(&job.fingerprint)
                    };
                    match cached {
                        Some(hit) => {
                            debug!("Cache hit for {}", job.target);
                            ledger.record_result(hit);
                        }
                        None => queue.push(job),
                    }
                }
            }
        }

        let settings = self.settings.for_request(&request);
        let abort = self
            .process_queue(&property, &queue, &settings, &mut ledger)
            .await;

        let state = if abort.is_some() {
            RunState::Aborted
        } else {
            RunState::Completed
        };
        ledger.progress.state = state;
        ledger.progress.current_url = None;
        control.publish(&ledger.progress);

        let summary = RunReport::summarize(&ledger.results, &ledger.failures, &ledger.not_attempted);
        info!(
            "Run {} {:?}: {} results ({} cached), {} failures, {} not attempted",
            run_id, state, summary.succeeded, summary.cached, summary.failed, summary.not_attempted
        );

        RunReport {
            run_id,
            property,
            state,
            results: ledger.results,
            failures: ledger.failures,
            not_attempted: ledger.not_attempted,
            aborted: abort.is_some(),
            abort_reason: abort,
            summary,
            started_at,
            finished_at: self.clock.now(),
        }
    }

    /// Works through live jobs batch by batch. Returns the abort reason, if any.
    async fn process_queue(
        &self,
        property: &str,
        queue: &[Job],
        settings: &SchedulerSettings,
        ledger: &mut Ledger<'_>,
    ) -> Option<AbortReason> {
        let batch_size = settings.batch_size.max(1);

        for (position, job) in queue.iter().enumerate() {
            if position % batch_size == 0 {
                let boundary_ok = if position == 0 {
                    !ledger.control.is_cancelled()
                } else {
                    debug!(
                        "Batch {} done, pausing {:?}",
                        position / batch_size,
                        settings.inter_batch_delay
                    );
                    self.pause(settings.inter_batch_delay, ledger.control).await
                };
                if !boundary_ok {
                    info!("Run cancelled at batch boundary");
                    return Some(self.abandon(queue, position, ledger, AbortReason::Cancelled));
                }
            }

            ledger.working_on(&job.target);
            match self.inspect_job(property, job, ledger.control).await {
                JobOutcome::Done(result) => {
                    debug!("Inspected {}", job.target);
                    self.cache
                        .write()
                        .await
                        .put(job.fingerprint.clone(), result.clone());
                    ledger.record_result(result);
                }
                JobOutcome::Failed(failure) => {
                    warn!(
                        "Inspection of {} failed after {} attempt(s): {}",
                        failure.url, failure.attempts, failure.message
                    );
                    ledger.record_failure(failure);
                }
                JobOutcome::Abort(reason) => {
                    return Some(self.abandon(queue, position, ledger, reason));
                }
            }
        }

        None
    }

    fn abandon(
        &self,
        queue: &[Job],
        position: usize,
        ledger: &mut Ledger<'_>,
        reason: AbortReason,
    ) -> AbortReason {
        ledger
            .not_attempted
            .extend(queue[position..].iter().map(|job| job.target.clone()));
        reason
    }

    /// Admission, call and retry loop for one URL.
    async fn inspect_job(&self, property: &str, job: &Job, control: &RunControl) -> JobOutcome {
        let mut attempts = 0;
        let mut retries = RetriesUsed::default();

        loop {
            if let Err(reason) = self.admit(control).await {
                return JobOutcome::Abort(reason);
            }
            attempts += 1;

            let outcome = match tokio::time::timeout(
                self.settings.request_timeout,
                self.inspector.inspect(property, &job.target),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(InspectError::Transient(format!(
                    "no response within {:?}",
                    self.settings.request_timeout
                ))),
            };

            let err = match outcome {
                Ok(result) => return JobOutcome::Done(result),
                Err(InspectError::Auth(message)) => {
                    error!("Credential rejected while inspecting {}: {}", job.target, message);
                    return JobOutcome::Abort(AbortReason::AuthError { message });
                }
                Err(err) => err,
            };

            match self.settings.retry.decide(&err, &retries) {
                RetryDecision::RetryAfter(delay) => {
                    retries.record(&err);
                    warn!(
                        "Retrying {} in {:?} (retry {}): {}",
                        job.target,
                        delay,
                        retries.total(),
                        err
                    );
                    self.clock.sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    return JobOutcome::Failed(FailureRecord {
                        url: job.target.clone(),
                        kind: err.kind(),
                        message: err.to_string(),
                        attempts,
                    });
                }
            }
        }
    }

    /// Waits for quota admission unless the wait would exceed the configured maximum.
    async fn admit(&self, control: &RunControl) -> Result<(), AbortReason> {
        loop {
            match self.quota.try_admit() {
                Admission::Admitted => return Ok(()),
                Admission::Denied {
                    reason,
                    retry_after,
                } => {
                    if retry_after > self.settings.max_admission_wait {
                        warn!(
                            "Quota {:?} needs a {:?} wait, above the {:?} limit; abandoning queue",
                            reason, retry_after, self.settings.max_admission_wait
                        );
                        return Err(AbortReason::QuotaExceeded {
                            reason,
                            retry_after_secs: ceil_secs(retry_after),
                        });
                    }
                    warn!("Quota {:?}, waiting {:?}", reason, retry_after);
                    if !self.pause(retry_after, control).await {
                        return Err(AbortReason::Cancelled);
                    }
                }
            }
        }
    }

    /// Sleeps on the clock; returns `false` if the run was cancelled first.
    async fn pause(&self, duration: Duration, control: &RunControl) -> bool {
        let cancel = control.cancel_token();
        if cancel.is_cancelled() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = self.clock.sleep(duration) => !cancel.is_cancelled(),
        }
    }
}

/// Normalizes and deduplicates input, keeping first-occurrence order.
/// Blank lines are skipped.
fn plan(property: &str, urls: &[String]) -> Vec<Planned> {
    let mut seen_jobs = HashSet::new();
    let mut seen_invalid = HashSet::new();
    let mut planned = Vec::new();

    for raw in urls {
        if raw.trim().is_empty() {
            continue;
        }
        match normalize(raw, property) {
            Ok(url) => {
                let fingerprint = Fingerprint::new(property, &url);
                if seen_jobs.insert(fingerprint.clone()) {
                    planned.push(Planned::Job(Job {
                        fingerprint,
                        target: url.target,
                    }));
                }
            }
            Err(error) => {
                let url = raw.trim().to_string();
                if seen_invalid.insert(url.clone()) {
                    planned.push(Planned::Invalid { url, error });
                }
            }
        }
    }

    planned
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
