// Watcher state machine
//
// Every change to a watcher goes through `WatcherState::apply`. It runs
// synchronously under the watcher's lock and tells the caller what to do
// next (notify listeners, dispatch analysis, keep polling). No timers or IO here.

use super::poller::{Observation, PollControl, StatusTracker};
use super::trigger::{CompletionTrigger, LatchState};
use crate::models::{AnalysisResult, JobPhase, JobStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Created,
    Polling,
    Analyzing,
    Settled,
    Stopped,
}

/// Everything that can happen to a watcher.
#[derive(Debug, Clone)]
pub enum Input {
    Start,
    StatusFetched(JobStatus),
    FetchFailed(String),
    AnalysisSucceeded(AnalysisResult),
    AnalysisFailed(String),
    RetryAnalysis,
    Stop,
}

/// Notification delivered to `on_update` listeners.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatcherUpdate {
    Status { status: JobStatus },
    Analysis { analysis: AnalysisResult },
    AnalysisFailed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub updates: Vec<WatcherUpdate>,
    /// Status snapshot to send to the analyzer, when the latch just closed.
    pub dispatch: Option<JobStatus>,
    pub poll: PollControl,
    /// Whether the input changed anything at all.
    pub applied: bool,
}

impl Outcome {
    fn ignored(poll: PollControl) -> Self {
        Self {
            updates: Vec::new(),
            dispatch: None,
            poll,
            applied: false,
        }
    }

    fn applied(poll: PollControl) -> Self {
        Self {
            applied: true,
            ..Self::ignored(poll)
        }
    }
}

/// Read-only view for callers and the frontend.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WatcherSnapshot {
    pub job_id: String,
    pub lifecycle: Lifecycle,
    pub status: Option<JobStatus>,
    pub analysis: Option<AnalysisResult>,
    pub analysis_error: Option<String>,
    pub analysis_latch: LatchState,
    pub transient_failures: u32,
    pub last_fetch_error: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WatcherState {
    job_id: String,
    lifecycle: Lifecycle,
    tracker: StatusTracker,
    trigger: CompletionTrigger,
    analysis: Option<AnalysisResult>,
    analysis_error: Option<String>,
    transient_failures: u32,
    last_fetch_error: Option<String>,
    updated_at: Option<String>,
    detached: bool,
}

impl WatcherState {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            lifecycle: Lifecycle::Created,
            tracker: StatusTracker::new(),
            trigger: CompletionTrigger::new(),
            analysis: None,
            analysis_error: None,
            transient_failures: 0,
            last_fetch_error: None,
            updated_at: None,
            detached: false,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn status(&self) -> Option<&JobStatus> {
        self.tracker.latest()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn analysis_error(&self) -> Option<&str> {
        self.analysis_error.as_deref()
    }

    pub fn dispatch_count(&self) -> u32 {
        self.trigger.dispatch_count()
    }

    /// True once `stop()` was called, whatever the lifecycle was at the time.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn snapshot(&self) -> WatcherSnapshot {
        WatcherSnapshot {
            job_id: self.job_id.clone(),
            lifecycle: self.lifecycle,
            status: self.tracker.latest().cloned(),
            analysis: self.analysis.clone(),
            analysis_error: self.analysis_error.clone(),
            analysis_latch: self.trigger.latch(),
            transient_failures: self.transient_failures,
            last_fetch_error: self.last_fetch_error.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    /// The single transition function.
    pub fn apply(&mut self, input: Input) -> Outcome {
        if self.detached {
            return Outcome::ignored(PollControl::Finish);
        }

        match input {
            Input::Start => self.on_start(),
            Input::StatusFetched(status) => self.on_status(status),
            Input::FetchFailed(error) => self.on_fetch_failed(error),
            Input::AnalysisSucceeded(result) => self.on_analysis(Ok(result)),
            Input::AnalysisFailed(error) => self.on_analysis(Err(error)),
            Input::RetryAnalysis => self.on_retry(),
            Input::Stop => self.on_stop(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }

    fn on_start(&mut self) -> Outcome {
        if self.lifecycle != Lifecycle::Created {
            return Outcome::ignored(self.poll_control());
        }
        self.lifecycle = Lifecycle::Polling;
        Outcome::applied(PollControl::Continue)
    }

    fn on_status(&mut self, status: JobStatus) -> Outcome {
        if self.lifecycle != Lifecycle::Polling {
            return Outcome::ignored(self.poll_control());
        }

        if status.job_id != self.job_id {
            return Outcome::ignored(PollControl::Continue);
        }

        self.transient_failures = 0;
        self.last_fetch_error = None;

        match self.tracker.observe(status) {
            Observation::Stale | Observation::Unchanged => return Outcome::ignored(PollControl::Continue),
            Observation::Accepted => {}
        }

        self.touch();
        let Some(accepted) = self.tracker.latest().cloned() else {
            return Outcome::ignored(PollControl::Continue);
        };

        let mut outcome = Outcome::applied(PollControl::Continue);

        match accepted.phase {
            JobPhase::Queued | JobPhase::Running => {}
            JobPhase::Done => {
                if self.trigger.observe(&accepted) {
                    outcome.dispatch = Some(accepted.clone());
                    self.lifecycle = Lifecycle::Analyzing;
                } else {
                    self.lifecycle = Lifecycle::Settled;
                }
                outcome.poll = PollControl::Finish;
            }
            JobPhase::Failed => {
                self.lifecycle = Lifecycle::Settled;
                outcome.poll = PollControl::Finish;
            }
        }

        outcome.updates.push(WatcherUpdate::Status { status: accepted });
        outcome
    }

    fn on_fetch_failed(&mut self, error: String) -> Outcome {
        if self.lifecycle != Lifecycle::Polling {
            return Outcome::ignored(self.poll_control());
        }

        self.transient_failures = self.transient_failures.saturating_add(1);
        self.last_fetch_error = Some(error);
        Outcome::applied(PollControl::Continue)
    }

    fn on_analysis(&mut self, result: Result<AnalysisResult, String>) -> Outcome {
        if self.lifecycle != Lifecycle::Analyzing || !self.trigger.resolve(result.is_ok()) {
            return Outcome::ignored(PollControl::Finish);
        }

        self.lifecycle = Lifecycle::Settled;
        self.touch();
        let mut outcome = Outcome::applied(PollControl::Finish);

        match result {
            Ok(analysis) => {
                // Written once; a second success can only follow a manual retry of a failure.
                if self.analysis.is_none() {
                    self.analysis = Some(analysis.clone());
                    self.analysis_error = None;
                    outcome.updates.push(WatcherUpdate::Analysis { analysis });
                }
            }
            Err(error) => {
                self.analysis_error = Some(error.clone());
                outcome.updates.push(WatcherUpdate::AnalysisFailed { error });
            }
        }

        outcome
    }

    fn on_retry(&mut self) -> Outcome {
        if self.lifecycle != Lifecycle::Settled || self.analysis.is_some() || !self.trigger.rearm() {
            return Outcome::ignored(PollControl::Finish);
        }

        self.lifecycle = Lifecycle::Analyzing;
        let mut outcome = Outcome::applied(PollControl::Finish);
        outcome.dispatch = self.tracker.latest().cloned();
        outcome
    }

    fn on_stop(&mut self) -> Outcome {
        self.detached = true;
        if self.lifecycle != Lifecycle::Settled {
            self.lifecycle = Lifecycle::Stopped;
        }
        Outcome::applied(PollControl::Finish)
    }

    fn poll_control(&self) -> PollControl {
        if self.lifecycle == Lifecycle::Polling {
            PollControl::Continue
        } else {
            PollControl::Finish
        }
    }
}
