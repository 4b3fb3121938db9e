// Job watcher: poller + completion trigger for one submitted job
use super::poller::{clamp_interval, poll_until_terminal, PollControl};
use super::state::{Input, Lifecycle, Outcome, WatcherSnapshot, WatcherState, WatcherUpdate};
use crate::models::{AnalysisRequest, AnalysisResult, JobStatus};
use crate::services::{Analyzer, Evaluator};
use log::{debug, info, warn};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub type UpdateListener = Arc<dyn Fn(&WatcherUpdate) + Send + Sync>;

/// What the analyzer needs besides the job status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionContext {
    pub problem_id: Option<String>,
    pub source: String,
}

#[derive(Default)]
struct Tasks {
    poll: Option<JoinHandle<()>>,
    analysis: Option<JoinHandle<()>>,
}

struct Shared {
    job_id: String,
    interval: Duration,
    context: SubmissionContext,
    evaluator: Arc<dyn Evaluator>,
    analyzer: Arc<dyn Analyzer>,
    state: Mutex<WatcherState>,
    listeners: Mutex<Vec<UpdateListener>>,
    // Held while an outcome is committed and delivered, and by `stop`, so that once
    // `stop` returns no listener can be reached. Reentrant: listeners may call `stop`.
    delivery: ReentrantMutex<()>,
    tasks: Mutex<Tasks>,
}

impl Shared {
    fn commit(&self, input: Input) -> Outcome {
        let _delivery = self.delivery.lock();
        let outcome = self.state.lock().apply(input);

        if !outcome.updates.is_empty() {
            let listeners: Vec<UpdateListener> = self.listeners.lock().clone();
            for update in &outcome.updates {
                for listener in &listeners {
                    listener(update);
                }
            }
        }

        outcome
    }

    fn handle_fetch(self: &Arc<Self>, result: Result<JobStatus, crate::services::ServiceError>) -> PollControl {
        let input = match result {
            Ok(status) => Input::StatusFetched(status),
            Err(e) => Input::FetchFailed(e.to_string()),
        };

        let _delivery = self.delivery.lock();
        let outcome = self.commit(input);
        if let Some(status) = outcome.dispatch {
            self.dispatch_analysis(status);
        }
        outcome.poll
    }

    // Callers hold the delivery lock, so `stop` cannot slip in before the handle is stored.
    fn dispatch_analysis(self: &Arc<Self>, status: JobStatus) {
        if self.state.lock().is_detached() {
            return;
        }

        let request = AnalysisRequest {
            problem_id: self.context.problem_id.clone(),
            source: self.context.source.clone(),
            status,
        };

        info!("Job {} finished, requesting analysis", self.job_id);
        let shared = self.clone();
        let handle = tokio::spawn(async move {
            let result = shared.analyzer.request_analysis(&request).await;
            let input = match result {
                Ok(analysis) => Input::AnalysisSucceeded(analysis),
                Err(e) => {
                    warn!("Analysis for job {} failed: {}", shared.job_id, e);
                    Input::AnalysisFailed(e.to_string())
                }
            };
            if !shared.commit(input).applied {
                debug!("Discarded analysis answer for job {}", shared.job_id);
            }
        });

        self.tasks.lock().analysis = Some(handle);
    }
}

/// Watches one evaluator job until it settles, then chains the analysis request.
///
/// Requires a tokio runtime. Dropping the watcher stops it.
pub struct JobWatcher {
    shared: Arc<Shared>,
}

impl JobWatcher {
    pub fn new(
        job_id: impl Into<String>,
        interval_ms: u64,
        context: SubmissionContext,
        evaluator: Arc<dyn Evaluator>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let job_id = job_id.into();
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(WatcherState::new(job_id.clone())),
                job_id,
                interval: clamp_interval(interval_ms),
                context,
                evaluator,
                analyzer,
                listeners: Mutex::new(Vec::new()),
                delivery: ReentrantMutex::new(()),
                tasks: Mutex::new(Tasks::default()),
            }),
        }
    }

    /// Create and immediately start a watcher.
    pub fn spawn(
        job_id: impl Into<String>,
        interval_ms: u64,
        context: SubmissionContext,
        evaluator: Arc<dyn Evaluator>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let watcher = Self::new(job_id, interval_ms, context, evaluator, analyzer);
        watcher.start();
        watcher
    }

    /// Begin polling. The first fetch is issued right away. No-op unless freshly created.
    pub fn start(&self) -> bool {
        let _delivery = self.shared.delivery.lock();
        if !self.shared.commit(Input::Start).applied {
            return false;
        }

        info!(
            "Watching job {} every {}ms",
            self.shared.job_id,
            self.shared.interval.as_millis()
        );

        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            let loop_shared = shared.clone();
            poll_until_terminal(
                shared.evaluator.clone(),
                shared.job_id.clone(),
                shared.interval,
                move |result| loop_shared.handle_fetch(result),
            )
            .await;
        });

        self.shared.tasks.lock().poll = Some(handle);
        true
    }

    /// Cancel polling and any in-flight analysis. Idempotent.
    pub fn stop(&self) {
        let _delivery = self.shared.delivery.lock();
        if !self.shared.state.lock().apply(Input::Stop).applied {
            return;
        }

        let mut tasks = self.shared.tasks.lock();
        if let Some(poll) = tasks.poll.take() {
            poll.abort();
        }
        if let Some(analysis) = tasks.analysis.take() {
            analysis.abort();
        }
        debug!("Stopped watcher for job {}", self.shared.job_id);
    }

    /// Explicit, caller-driven retry after a failed analysis.
    pub fn retry_analysis(&self) -> bool {
        let _delivery = self.shared.delivery.lock();
        let outcome = self.shared.commit(Input::RetryAnalysis);
        match outcome.dispatch {
            Some(status) => {
                self.shared.dispatch_analysis(status);
                true
            }
            None => false,
        }
    }

    /// Register a listener for accepted status changes and analysis resolution.
    pub fn on_update<F>(&self, listener: F)
    where
        F: Fn(&WatcherUpdate) + Send + Sync + 'static,
    {
        self.shared.listeners.lock().push(Arc::new(listener));
    }

    pub fn job_id(&self) -> &str {
        &self.shared.job_id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.state.lock().lifecycle()
    }

    /// Settled or stopped: nothing will be reported any more unless an analysis is retried.
    pub fn is_finished(&self) -> bool {
        matches!(self.lifecycle(), Lifecycle::Settled | Lifecycle::Stopped)
    }

    pub fn current_status(&self) -> Option<JobStatus> {
        self.shared.state.lock().status().cloned()
    }

    pub fn analysis(&self) -> Option<AnalysisResult> {
        self.shared.state.lock().analysis().cloned()
    }

    pub fn analysis_error(&self) -> Option<String> {
        self.shared.state.lock().analysis_error().map(str::to_string)
    }

    pub fn snapshot(&self) -> WatcherSnapshot {
        self.shared.state.lock().snapshot()
    }
}

impl Drop for JobWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseResult, JobPhase};
    use crate::services::ServiceError;
    use crate::watcher::testing::{ScriptedAnalyzer, ScriptedEvaluator};

    const JOB: &str = "sub-7";
    const INTERVAL_MS: u64 = 800;

    fn status(phase: JobPhase) -> JobStatus {
        JobStatus::new(JOB, phase)
    }

    fn two_case_done() -> JobStatus {
        JobStatus {
            job_id: JOB.to_string(),
            phase: JobPhase::Done,
            case_results: vec![
                CaseResult { ordinal: 1, passed: true, stdout: Some("[0,1]".into()), stderr: None, time_ms: Some(10) },
                CaseResult { ordinal: 2, passed: false, stdout: Some("[0,0]".into()), stderr: None, time_ms: Some(11) },
            ],
            total_time_ms: Some(21),
            total_memory_kb: Some(1980),
            diagnostic: None,
        }
    }

    fn recorder(watcher: &JobWatcher) -> Arc<Mutex<Vec<WatcherUpdate>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        watcher.on_update(move |update| sink.lock().push(update.clone()));
        seen
    }

    fn seen_phases(seen: &Arc<Mutex<Vec<WatcherUpdate>>>) -> Vec<JobPhase> {
        seen.lock()
            .iter()
            .filter_map(|u| match u {
                WatcherUpdate::Status { status } => Some(status.phase),
                _ => None,
            })
            .collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lifecycle_requests_analysis_once() {
        let evaluator = ScriptedEvaluator::new()
            .respond(status(JobPhase::Queued))
            .respond(status(JobPhase::Queued))
            .respond(status(JobPhase::Running))
            .respond(two_case_done());
        let fetches = evaluator.calls();

        let analyzer = ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["check duplicates"]));
        let analyses = analyzer.calls();
        let requests = analyzer.requests();

        let context = SubmissionContext {
            problem_id: Some("two-sum".to_string()),
            source: "class Solution {};".to_string(),
        };
        let watcher = JobWatcher::new(JOB, INTERVAL_MS, context, Arc::new(evaluator), Arc::new(analyzer));
        let seen = recorder(&watcher);
        assert!(watcher.start());

        settle().await;

        assert_eq!(fetches.count(), 4);
        assert_eq!(analyses.count(), 1);
        assert_eq!(requests.lock()[0].status, two_case_done());
        assert_eq!(requests.lock()[0].problem_id.as_deref(), Some("two-sum"));

        assert_eq!(watcher.lifecycle(), Lifecycle::Settled);
        assert_eq!(watcher.current_status(), Some(two_case_done()));
        assert_eq!(watcher.analysis(), Some(AnalysisResult::with_hints(["check duplicates"])));

        assert_eq!(seen_phases(&seen), vec![JobPhase::Queued, JobPhase::Running, JobPhase::Done]);
        assert_eq!(
            seen.lock().last(),
            Some(&WatcherUpdate::Analysis {
                analysis: AnalysisResult::with_hints(["check duplicates"])
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_never_requests_analysis() {
        let evaluator = ScriptedEvaluator::new()
            .respond(status(JobPhase::Running))
            .respond(JobStatus {
                diagnostic: Some("compile error".to_string()),
                ..status(JobPhase::Failed)
            });
        let analyzer = ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["unused"]));
        let analyses = analyzer.calls();

        let watcher = JobWatcher::spawn(JOB, INTERVAL_MS, SubmissionContext::default(), Arc::new(evaluator), Arc::new(analyzer));
        settle().await;

        assert_eq!(analyses.count(), 0);
        assert_eq!(watcher.lifecycle(), Lifecycle::Settled);
        assert_eq!(watcher.current_status().map(|s| s.phase), Some(JobPhase::Failed));
        assert!(watcher.analysis().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_report_nothing_until_success() {
        let evaluator = ScriptedEvaluator::new()
            .fail(ServiceError::Transport("connection refused".into()))
            .fail(ServiceError::Transport("connection refused".into()))
            .respond(status(JobPhase::Queued));
        let fetches = evaluator.calls();

        let watcher = JobWatcher::new(
            JOB,
            INTERVAL_MS,
            SubmissionContext::default(),
            Arc::new(evaluator),
            Arc::new(ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["x"]))),
        );
        let seen = recorder(&watcher);
        watcher.start();

        // Fetches at t=0 and t=800 fail
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fetches.count(), 2);
        assert!(seen.lock().is_empty());
        assert!(watcher.current_status().is_none());
        assert_eq!(watcher.snapshot().transient_failures, 2);
        assert_eq!(watcher.lifecycle(), Lifecycle::Polling);

        // Third fetch at t=1600 succeeds
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(seen_phases(&seen), vec![JobPhase::Queued]);
        assert_eq!(watcher.snapshot().transient_failures, 0);

        watcher.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_reply_suppresses_everything() {
        let evaluator = ScriptedEvaluator::new().respond_after(Duration::from_millis(500), two_case_done());
        let analyzer = ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["never"]));
        let analyses = analyzer.calls();

        let watcher = JobWatcher::new(JOB, INTERVAL_MS, SubmissionContext::default(), Arc::new(evaluator), Arc::new(analyzer));
        let seen = recorder(&watcher);
        watcher.start();
        watcher.stop();

        settle().await;

        assert!(seen.lock().is_empty());
        assert!(watcher.current_status().is_none());
        assert!(watcher.analysis().is_none());
        assert_eq!(analyses.count(), 0);
        assert_eq!(watcher.lifecycle(), Lifecycle::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_fetch_in_flight() {
        let evaluator = ScriptedEvaluator::new()
            .respond(status(JobPhase::Running))
            .respond_after(Duration::from_millis(500), two_case_done());
        let fetches = evaluator.calls();
        let analyzer = ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["never"]));
        let analyses = analyzer.calls();

        let watcher = JobWatcher::new(JOB, INTERVAL_MS, SubmissionContext::default(), Arc::new(evaluator), Arc::new(analyzer));
        let seen = recorder(&watcher);
        watcher.start();

        // Second fetch starts at t=800 and would resolve at t=1300
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fetches.count(), 2);
        watcher.stop();

        settle().await;
        assert_eq!(seen_phases(&seen), vec![JobPhase::Running]);
        assert_eq!(watcher.current_status().map(|s| s.phase), Some(JobPhase::Running));
        assert_eq!(analyses.count(), 0);
        assert_eq!(fetches.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_analysis_in_flight() {
        let evaluator = ScriptedEvaluator::new().respond(two_case_done());
        let analyzer = ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["late"]))
            .delayed(Duration::from_secs(2));
        let analyses = analyzer.calls();

        let watcher = JobWatcher::new(JOB, INTERVAL_MS, SubmissionContext::default(), Arc::new(evaluator), Arc::new(analyzer));
        let seen = recorder(&watcher);
        watcher.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(watcher.lifecycle(), Lifecycle::Analyzing);
        assert_eq!(analyses.count(), 1);

        watcher.stop();
        settle().await;

        assert_eq!(watcher.lifecycle(), Lifecycle::Stopped);
        assert!(watcher.analysis().is_none());
        assert_eq!(seen_phases(&seen), vec![JobPhase::Done]);
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_failure_is_recorded_without_retry() {
        let evaluator = ScriptedEvaluator::new().respond(two_case_done());
        let fetches = evaluator.calls();
        let analyzer = ScriptedAnalyzer::with_results(vec![
            Err(ServiceError::Http { status: 502, message: "bad gateway".into() }),
            Ok(AnalysisResult::with_hints(["second time lucky"])),
        ]);
        let analyses = analyzer.calls();

        let watcher = JobWatcher::new(JOB, INTERVAL_MS, SubmissionContext::default(), Arc::new(evaluator), Arc::new(analyzer));
        let seen = recorder(&watcher);
        watcher.start();
        settle().await;

        assert_eq!(analyses.count(), 1);
        assert_eq!(fetches.count(), 1);
        assert_eq!(watcher.lifecycle(), Lifecycle::Settled);
        assert_eq!(watcher.current_status(), Some(two_case_done()));
        assert!(watcher.analysis().is_none());
        assert!(watcher.analysis_error().unwrap().contains("bad gateway"));
        assert!(matches!(seen.lock().last(), Some(WatcherUpdate::AnalysisFailed { .. })));

        // Manual retry is a separate, explicit action
        assert!(watcher.retry_analysis());
        assert!(!watcher.retry_analysis());
        settle().await;

        assert_eq!(analyses.count(), 2);
        assert_eq!(watcher.analysis(), Some(AnalysisResult::with_hints(["second time lucky"])));
        assert!(watcher.analysis_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reply_is_not_reported() {
        let evaluator = ScriptedEvaluator::new()
            .respond(status(JobPhase::Running))
            .respond(status(JobPhase::Queued))
            .respond(two_case_done())
            .respond(status(JobPhase::Running));
        let fetches = evaluator.calls();

        let watcher = JobWatcher::new(
            JOB,
            INTERVAL_MS,
            SubmissionContext::default(),
            Arc::new(evaluator),
            Arc::new(ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["x"]))),
        );
        let seen = recorder(&watcher);
        watcher.start();
        settle().await;

        assert_eq!(seen_phases(&seen), vec![JobPhase::Running, JobPhase::Done]);
        assert_eq!(watcher.current_status().map(|s| s.phase), Some(JobPhase::Done));
        // Polling ended at the terminal reply
        assert_eq!(fetches.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_may_stop_watcher() {
        let evaluator = ScriptedEvaluator::new()
            .respond(status(JobPhase::Running))
            .respond(two_case_done());
        let analyzer = ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["x"]));
        let analyses = analyzer.calls();

        let watcher = Arc::new(JobWatcher::new(
            JOB,
            INTERVAL_MS,
            SubmissionContext::default(),
            Arc::new(evaluator),
            Arc::new(analyzer),
        ));
        let weak = Arc::downgrade(&watcher);
        watcher.on_update(move |_| {
            if let Some(watcher) = weak.upgrade() {
                watcher.stop();
            }
        });
        watcher.start();
        settle().await;

        assert_eq!(watcher.lifecycle(), Lifecycle::Stopped);
        assert_eq!(watcher.current_status().map(|s| s.phase), Some(JobPhase::Running));
        assert_eq!(analyses.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_misuse_is_harmless() {
        let watcher = JobWatcher::new(
            JOB,
            INTERVAL_MS,
            SubmissionContext::default(),
            Arc::new(ScriptedEvaluator::new().respond(status(JobPhase::Queued))),
            Arc::new(ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["x"]))),
        );

        // Never started
        assert!(watcher.current_status().is_none());
        assert!(!watcher.retry_analysis());

        watcher.stop();
        watcher.stop();
        assert_eq!(watcher.lifecycle(), Lifecycle::Stopped);
        assert!(!watcher.start());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_watcher_stops_polling() {
        let evaluator = ScriptedEvaluator::new().respond(status(JobPhase::Queued));
        let fetches = evaluator.calls();

        let watcher = JobWatcher::spawn(
            JOB,
            INTERVAL_MS,
            SubmissionContext::default(),
            Arc::new(evaluator),
            Arc::new(ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["x"]))),
        );
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let before = fetches.count();
        assert_eq!(before, 2);

        drop(watcher);
        settle().await;
        assert_eq!(fetches.count(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let evaluator = ScriptedEvaluator::new().respond(status(JobPhase::Queued));
        let fetches = evaluator.calls();

        let watcher = JobWatcher::spawn(
            JOB,
            0,
            SubmissionContext::default(),
            Arc::new(evaluator),
            Arc::new(ScriptedAnalyzer::succeeding(AnalysisResult::with_hints(["x"]))),
        );
        tokio::time::sleep(Duration::from_millis(1000)).await;
        watcher.stop();

        // One fetch at t=0, then one per 50ms floor
        assert!(fetches.count() <= 21, "too many fetches: {}", fetches.count());
    }
}
