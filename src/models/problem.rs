// Catalog and submission data models
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblemSummary {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Example or test case. Inputs and outputs are free-form JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExampleIo {
    #[serde(rename = "in")]
    pub input: serde_json::Value,
    #[serde(rename = "out")]
    pub output: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetail {
    #[serde(flatten)]
    pub summary: ProblemSummary,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub examples: Vec<ExampleIo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProblemRequest {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub statement: String,
    pub examples: Vec<ExampleIo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_code: Option<String>,
    pub tests: Vec<ExampleIo>,
}

impl CreateProblemRequest {
    /// Basic checks the admin form used to do before posting.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() || self.title.trim().is_empty() {
            return Err("id and title are required".to_string());
        }
        if self.tests.is_empty() {
            return Err("at least one test case is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Cpp,
    Python,
    Java,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub problem_id: String,
    pub lang: Language,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCreated {
    pub submission_id: String,
}
