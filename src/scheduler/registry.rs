//! Run Registry Module
//!
//! Keeps spawned runs addressable by id so callers can poll progress,
//! collect the report and cancel, without holding the [`RunHandle`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

use crate::scheduler::{RunHandle, RunProgress, RunReport};

/// Finished runs kept for polling before the oldest is forgotten
pub const MAX_FINISHED_RUNS: usize = 100;

// == Run Status ==
/// Poll view of a tracked run; `report` is present once it has finished.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub run_id: Uuid,
    pub progress: RunProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
}

enum Outcome {
    Finished(RunReport),
    Crashed(String),
}

struct TrackedRun {
    progress: watch::Receiver<RunProgress>,
    cancel: CancellationToken,
    outcome: Option<Outcome>,
}

#[derive(Default)]
struct Runs {
    tracked: HashMap<Uuid, TrackedRun>,
    finished: VecDeque<Uuid>,
}

// == Run Registry ==
#[derive(Default)]
pub struct RunRegistry {
    runs: Mutex<Runs>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `handle` and records its outcome when it ends.
    pub fn track(self: &Arc<Self>, handle: RunHandle) -> Uuid {
        let RunHandle {
            run_id,
            progress,
            cancel,
            join,
        } = handle;

        self.lock().tracked.insert(
            run_id,
            TrackedRun {
                progress,
                cancel,
                outcome: None,
            },
        );

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = join.await;
            registry.finish(run_id, outcome);
        });

        run_id
    }

    /// Current status of `run_id`.
    ///
    /// `None` for unknown ids, `Some(Err(_))` when the run's task died.
    pub fn status(&self, run_id: Uuid) -> Option<Result<RunStatus, String>> {
        let runs = self.lock();
        let run = runs.tracked.get(&run_id)?;

        let status = match &run.outcome {
            Some(Outcome::Crashed(message)) => return Some(Err(message.clone())),
            Some(Outcome::Finished(report)) => RunStatus {
                run_id,
                progress: run.progress.borrow().clone(),
                report: Some(report.clone()),
            },
            None => RunStatus {
                run_id,
                progress: run.progress.borrow().clone(),
                report: None,
            },
        };
        Some(Ok(status))
    }

    /// Requests cancellation. Returns `None` for unknown ids, otherwise
    /// whether the run was still in flight.
    pub fn cancel(&self, run_id: Uuid) -> Option<bool> {
        let runs = self.lock();
        let run = runs.tracked.get(&run_id)?;
        if run.outcome.is_some() {
            return Some(false);
        }
        run.cancel.cancel();
        Some(true)
    }

    pub fn len(&self) -> usize {
        self.lock().tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn finish(&self, run_id: Uuid, outcome: Result<RunReport, JoinError>) {
        let outcome = match outcome {
            Ok(report) => Outcome::Finished(report),
            Err(err) => {
                error!("Run {} task failed: {}", run_id, err);
                Outcome::Crashed(format!("run {run_id} failed: {err}"))
            }
        };

        let mut runs = self.lock();
        match runs.tracked.get_mut(&run_id) {
            Some(run) => run.outcome = Some(outcome),
            None => return,
        }
        runs.finished.push_back(run_id);
        while runs.finished.len() > MAX_FINISHED_RUNS {
            if let Some(oldest) = runs.finished.pop_front() {
                debug!("Forgetting finished run {}", oldest);
                runs.tracked.remove(&oldest);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Runs> {
        self.runs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
