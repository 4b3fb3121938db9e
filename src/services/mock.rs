// In-process stand-ins for the judge services
// Used when the corresponding settings toggle is on (offline demos, UI work)

use super::{Analyzer, Catalog, Evaluator, ServiceError};
use crate::models::{
    AnalysisRequest, AnalysisResult, CaseResult, CreateProblemRequest, Difficulty, ExampleIo,
    JobPhase, JobStatus, ProblemDetail, ProblemSummary, SubmissionCreated, SubmissionPayload,
};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

const SUBMIT_LATENCY_MS: u64 = 250;
const STATUS_LATENCY_MS: u64 = 250;
const ANALYSIS_LATENCY_MS: u64 = 300;
const RUNNING_AFTER_MS: u64 = 400;
const DONE_AFTER_MS: u64 = 1200;

/// Simulated evaluator: queued, then running after 400ms, done after 1200ms.
pub struct MockEvaluator {
    submissions: Mutex<HashMap<String, Instant>>,
}

impl MockEvaluator {
    pub fn new() -> Self {
        Self {
            submissions: Mutex::new(HashMap::new()),
        }
    }

    fn status_at(job_id: &str, elapsed: Duration) -> JobStatus {
        if elapsed < Duration::from_millis(RUNNING_AFTER_MS) {
            return JobStatus::new(job_id, JobPhase::Queued);
        }
        if elapsed < Duration::from_millis(DONE_AFTER_MS) {
            return JobStatus::new(job_id, JobPhase::Running);
        }

        JobStatus {
            job_id: job_id.to_string(),
            phase: JobPhase::Done,
            case_results: vec![
                CaseResult {
                    ordinal: 1,
                    passed: true,
                    stdout: Some("[0,1]".to_string()),
                    stderr: None,
                    time_ms: Some(5),
                },
                CaseResult {
                    ordinal: 2,
                    passed: true,
                    stdout: Some("[1,2]".to_string()),
                    stderr: None,
                    time_ms: Some(7),
                },
            ],
            total_time_ms: Some(12),
            total_memory_kb: Some(256),
            diagnostic: None,
        }
    }
}

impl Default for MockEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Evaluator for MockEvaluator {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionCreated, ServiceError> {
        tokio::time::sleep(Duration::from_millis(SUBMIT_LATENCY_MS)).await;

        let uuid = uuid::Uuid::new_v4().simple().to_string();
        let submission_id = format!("mock-{}", &uuid[..6]);
        self.submissions.lock().insert(submission_id.clone(), Instant::now());

        debug!("Mock submission {} for problem {}", submission_id, payload.problem_id);
        Ok(SubmissionCreated { submission_id })
    }

    async fn fetch_job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        tokio::time::sleep(Duration::from_millis(STATUS_LATENCY_MS)).await;

        let created = self.submissions.lock().get(job_id).copied();
        match created {
            Some(created) => Ok(Self::status_at(job_id, created.elapsed())),
            // Unknown ids stay queued, like a submission the evaluator has not picked up yet.
            None => Ok(JobStatus::new(job_id, JobPhase::Queued)),
        }
    }
}

pub struct MockAnalyzer;

impl MockAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Analyzer for MockAnalyzer {
    async fn request_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ServiceError> {
        tokio::time::sleep(Duration::from_millis(ANALYSIS_LATENCY_MS)).await;
        debug!("Mock analysis for job {}", request.status.job_id);

        Ok(AnalysisResult {
            hints: vec![
                "Think of a value-to-index map to speed up the lookup.".to_string(),
                "Be careful not to reuse the same index twice.".to_string(),
                "The expected complexity is O(n) time with O(n) extra space.".to_string(),
            ],
            patterns: Some(vec!["hashmap".to_string(), "two-pointers?".to_string()]),
            complexity: Some("O(n)".to_string()),
        })
    }
}

/// Catalog seeded with the classic two-sum problem; created problems live in memory.
pub struct MockCatalog {
    problems: Mutex<Vec<ProblemDetail>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        let two_sum = ProblemDetail {
            summary: ProblemSummary {
                id: "two-sum".to_string(),
                title: "Two Sum".to_string(),
                difficulty: Difficulty::Easy,
                tags: vec!["array".to_string(), "hashmap".to_string()],
            },
            statement: "Given an array nums and an integer target, return indices i and j such that \
                        nums[i] + nums[j] = target. Assume exactly one solution and do not reuse an element."
                .to_string(),
            examples: vec![
                ExampleIo {
                    input: serde_json::json!({ "nums": [2, 7, 11, 15], "target": 9 }),
                    output: serde_json::json!([0, 1]),
                },
                ExampleIo {
                    input: serde_json::json!({ "nums": [3, 2, 4], "target": 6 }),
                    output: serde_json::json!([1, 2]),
                },
            ],
            constraints: None,
            starter_code: None,
        };

        Self {
            problems: Mutex::new(vec![two_sum]),
        }
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Catalog for MockCatalog {
    async fn list_problems(&self) -> Result<Vec<ProblemSummary>, ServiceError> {
        Ok(self.problems.lock().iter().map(|p| p.summary.clone()).collect())
    }

    async fn get_problem(&self, id: &str) -> Result<ProblemDetail, ServiceError> {
        self.problems
            .lock()
            .iter()
            .find(|p| p.summary.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Problem not found (mock): {}", id)))
    }

    async fn create_problem(&self, request: &CreateProblemRequest) -> Result<serde_json::Value, ServiceError> {
        request.validate().map_err(ServiceError::InvalidResponse)?;

        let mut problems = self.problems.lock();
        if problems.iter().any(|p| p.summary.id == request.id) {
            return Err(ServiceError::Http {
                status: 409,
                message: format!("Problem already exists: {}", request.id),
            });
        }

        problems.push(ProblemDetail {
            summary: ProblemSummary {
                id: request.id.clone(),
                title: request.title.clone(),
                difficulty: request.difficulty,
                tags: request.tags.clone(),
            },
            statement: request.statement.clone(),
            examples: request.examples.clone(),
            constraints: None,
            starter_code: request.starter_code.clone(),
        });

        Ok(serde_json::json!({ "id": request.id }))
    }
}
