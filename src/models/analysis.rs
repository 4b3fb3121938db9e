// Analyzer data models
use super::job::{JobStatus, WireJobStatus};
use serde::{Deserialize, Serialize};

/// Hints derived from a finished job. Written once per watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub hints: Vec<String>,
    pub patterns: Option<Vec<String>>,
    pub complexity: Option<String>,
}

impl AnalysisResult {
    pub fn with_hints<I, S>(hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hints: hints.into_iter().map(Into::into).collect(),
            patterns: None,
            complexity: None,
        }
    }
}

/// What the watcher sends to the analyzer once the job is done.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub problem_id: Option<String>,
    pub source: String,
    pub status: JobStatus,
}

/// Body of `POST /analysis`.
#[derive(Debug, Clone, Serialize)]
pub struct WireAnalysisRequest {
    pub source: String,
    pub results: WireJobStatus,
    #[serde(rename = "problemId", skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<String>,
}

impl From<&AnalysisRequest> for WireAnalysisRequest {
    fn from(request: &AnalysisRequest) -> Self {
        Self {
            source: request.source.clone(),
            results: WireJobStatus::from(&request.status),
            problem_id: request.problem_id.clone(),
        }
    }
}

/// Response of `POST /analysis`.
#[derive(Debug, Clone, Deserialize)]
pub struct WireAnalysisResult {
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(rename = "probablePatterns", default)]
    pub probable_patterns: Option<Vec<String>>,
    #[serde(rename = "complexityEstimate", default)]
    pub complexity_estimate: Option<String>,
}

impl WireAnalysisResult {
    /// Validate and convert. An answer without hints is not a usable analysis.
    pub fn into_result(self) -> Result<AnalysisResult, String> {
        let hints: Vec<String> = self
            .hints
            .into_iter()
            .filter(|h| !h.trim().is_empty())
            .collect();

        if hints.is_empty() {
            return Err("analysis returned no hints".to_string());
        }

        Ok(AnalysisResult {
            hints,
            patterns: self.probable_patterns.filter(|p| !p.is_empty()),
            complexity: self.complexity_estimate.filter(|c| !c.trim().is_empty()),
        })
    }
}
