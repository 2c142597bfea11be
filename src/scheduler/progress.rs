//! Run progress and caller-side run control.

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::scheduler::RunReport;

// == Run State ==
/// `Pending -> Running -> {Completed, Aborted}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}

// == Run Progress ==
/// Live view of a run; `completed` counts every finished URL, `failed` is a subset of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cached: usize,
    pub live: usize,
    pub current_url: Option<String>,
    pub state: RunState,
}

impl RunProgress {
    pub fn pending() -> Self {
        Self {
            total: 0,
            completed: 0,
            failed: 0,
            cached: 0,
            live: 0,
            current_url: None,
            state: RunState::Pending,
        }
    }

    /// Completed share in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

// == Run Control ==
/// Caller's side channel into a run: progress out, cancellation in.
#[derive(Debug)]
pub struct RunControl {
    progress: watch::Sender<RunProgress>,
    cancel: CancellationToken,
}

impl RunControl {
    /// Creates a control and the receiver that observes its progress.
    pub fn new() -> (Self, watch::Receiver<RunProgress>) {
        let (progress, receiver) = watch::channel(RunProgress::pending());
        let control = Self {
            progress,
            cancel: CancellationToken::new(),
        };
        (control, receiver)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.progress.subscribe()
    }

    pub(crate) fn publish(&self, progress: &RunProgress) {
        self.progress.send_replace(progress.clone());
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new().0
    }
}

// == Run Handle ==
/// A run executing on its own task.
pub struct RunHandle {
    pub run_id: Uuid,
    pub progress: watch::Receiver<RunProgress>,
    pub cancel: CancellationToken,
    pub join: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Requests cooperative cancellation at the next batch boundary or wait.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> Result<RunReport, tokio::task::JoinError> {
        self.join.await
    }
}
