// Evaluator job data models
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Running,
    Done,
    #[serde(alias = "error")]
    Failed,
}

impl JobPhase {
    /// Position in the lifecycle ordering. `Done` and `Failed` share the last slot.
    pub fn rank(self) -> u8 {
        match self {
            JobPhase::Queued => 0,
            JobPhase::Running => 1,
            JobPhase::Done | JobPhase::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::Queued => "queued",
            JobPhase::Running => "running",
            JobPhase::Done => "done",
            JobPhase::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseResult {
    pub ordinal: u32,
    pub passed: bool,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatus {
    pub job_id: String,
    pub phase: JobPhase,
    pub case_results: Vec<CaseResult>,
    pub total_time_ms: Option<u64>,
    pub total_memory_kb: Option<u64>,
    pub diagnostic: Option<String>,
}

impl JobStatus {
    pub fn new(job_id: impl Into<String>, phase: JobPhase) -> Self {
        Self {
            job_id: job_id.into(),
            phase,
            case_results: Vec::new(),
            total_time_ms: None,
            total_memory_kb: None,
            diagnostic: None,
        }
    }
}

// ============= Evaluator wire format =============

/// Per-case entry as the evaluator reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireCaseResult {
    #[serde(rename = "case")]
    pub case_number: u32,
    pub pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(rename = "timeMs", default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
}

/// Body of `GET /submissions/{id}`. The job id is not part of the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireJobStatus {
    pub status: JobPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<WireCaseResult>>,
    #[serde(rename = "timeMs", default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
    #[serde(rename = "memoryKB", default, skip_serializing_if = "Option::is_none")]
    pub memory_kb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "compileErrors", default, skip_serializing_if = "Option::is_none")]
    pub compile_errors: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl WireJobStatus {
    /// Convert into the client model. Results and metrics only survive in `done`.
    pub fn into_status(self, job_id: &str) -> JobStatus {
        let done = self.status == JobPhase::Done;

        let case_results = if done {
            self.results
                .unwrap_or_default()
                .into_iter()
                .map(|c| CaseResult {
                    ordinal: c.case_number,
                    passed: c.pass,
                    stdout: non_blank(c.stdout),
                    stderr: non_blank(c.stderr),
                    time_ms: c.time_ms,
                })
                .collect()
        } else {
            Vec::new()
        };

        let diagnostic = match (non_blank(self.note), non_blank(self.compile_errors)) {
            (Some(note), Some(errors)) => Some(format!("{}\n{}", note, errors)),
            (note, errors) => note.or(errors),
        };

        JobStatus {
            job_id: job_id.to_string(),
            phase: self.status,
            case_results,
            total_time_ms: if done { self.time_ms } else { None },
            total_memory_kb: if done { self.memory_kb } else { None },
            diagnostic,
        }
    }
}

impl From<&JobStatus> for WireJobStatus {
    fn from(status: &JobStatus) -> Self {
        let results = if status.phase == JobPhase::Done {
            Some(
                status
                    .case_results
                    .iter()
                    .map(|c| WireCaseResult {
                        case_number: c.ordinal,
                        pass: c.passed,
                        stdout: c.stdout.clone(),
                        stderr: c.stderr.clone(),
                        time_ms: c.time_ms,
                    })
                    .collect(),
            )
        } else {
            None
        };

        Self {
            status: status.phase,
            results,
            time_ms: status.total_time_ms,
            memory_kb: status.total_memory_kb,
            note: status.diagnostic.clone(),
            compile_errors: None,
        }
    }
}
