// Scripted collaborators for watcher tests
use crate::models::{AnalysisRequest, AnalysisResult, JobPhase, JobStatus, SubmissionCreated, SubmissionPayload};
use crate::services::{Analyzer, Evaluator, ServiceError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct Step<T> {
    delay: Duration,
    result: Result<T, ServiceError>,
}

/// Replays a fixed sequence of status replies; the last step repeats forever.
pub struct ScriptedEvaluator {
    steps: Mutex<VecDeque<Step<JobStatus>>>,
    last: Mutex<Option<Step<JobStatus>>>,
    calls: CallCounter,
}

impl ScriptedEvaluator {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: CallCounter::default(),
        }
    }

    pub fn respond(self, status: JobStatus) -> Self {
        self.respond_after(Duration::ZERO, status)
    }

    pub fn respond_after(self, delay: Duration, status: JobStatus) -> Self {
        self.steps.lock().push_back(Step { delay, result: Ok(status) });
        self
    }

    pub fn fail(self, error: ServiceError) -> Self {
        self.steps.lock().push_back(Step { delay: Duration::ZERO, result: Err(error) });
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    fn next_step(&self) -> Option<Step<JobStatus>> {
        let next = self.steps.lock().pop_front();
        match next {
            Some(step) => {
                *self.last.lock() = Some(step.clone());
                Some(step)
            }
            None => self.last.lock().clone(),
        }
    }
}

#[async_trait::async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn submit(&self, _payload: &SubmissionPayload) -> Result<SubmissionCreated, ServiceError> {
        Ok(SubmissionCreated {
            submission_id: "scripted-job".to_string(),
        })
    }

    async fn fetch_job_status(&self, _job_id: &str) -> Result<JobStatus, ServiceError> {
        self.calls.bump();
        let step = self
            .next_step()
            .ok_or_else(|| ServiceError::Transport("script is empty".to_string()))?;

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
    }
}

/// Reports every job it is asked about in the same phase.
pub struct PhaseEvaluator {
    phase: JobPhase,
}

impl PhaseEvaluator {
    pub fn new(phase: JobPhase) -> Self {
        Self { phase }
    }
}

#[async_trait::async_trait]
impl Evaluator for PhaseEvaluator {
    async fn submit(&self, _payload: &SubmissionPayload) -> Result<SubmissionCreated, ServiceError> {
        Ok(SubmissionCreated {
            submission_id: "phase-job".to_string(),
        })
    }

    async fn fetch_job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        Ok(JobStatus::new(job_id, self.phase))
    }
}

/// Answers analysis requests from a script after an optional delay.
pub struct ScriptedAnalyzer {
    results: Mutex<VecDeque<Result<AnalysisResult, ServiceError>>>,
    delay: Duration,
    calls: CallCounter,
    requests: Arc<Mutex<Vec<AnalysisRequest>>>,
}

impl ScriptedAnalyzer {
    pub fn succeeding(result: AnalysisResult) -> Self {
        Self::with_results(vec![Ok(result)])
    }

    /// Results are handed out in order; the last one repeats.
    pub fn with_results(results: Vec<Result<AnalysisResult, ServiceError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            delay: Duration::ZERO,
            calls: CallCounter::default(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<AnalysisRequest>>> {
        self.requests.clone()
    }
}

#[async_trait::async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn request_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ServiceError> {
        self.calls.bump();
        self.requests.lock().push(request.clone());

        let result = {
            let mut results = self.results.lock();
            if results.len() > 1 {
                results.pop_front()
            } else {
                results.front().cloned()
            }
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        result.unwrap_or_else(|| Err(ServiceError::Transport("no scripted analysis".to_string())))
    }
}
