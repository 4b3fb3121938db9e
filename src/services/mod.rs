//! Remote collaborators: problem catalog, code evaluator, feedback analyzer.
//!
//! The watcher only sees the traits below. Whether a trait object talks HTTP
//! or is the in-process mock is decided from [`Settings`] at runtime.

pub mod error;
pub mod http;
pub mod mock;

use crate::models::{
    AnalysisRequest, AnalysisResult, CreateProblemRequest, JobStatus, ProblemDetail,
    ProblemSummary, Settings, SubmissionCreated, SubmissionPayload,
};
pub use error::ServiceError;
use log::info;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait Evaluator: Send + Sync {
    /// Create a submission and return its job id.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionCreated, ServiceError>;

    /// Idempotent; safe to call repeatedly.
    async fn fetch_job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError>;
}

#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    async fn request_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ServiceError>;
}

#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    async fn list_problems(&self) -> Result<Vec<ProblemSummary>, ServiceError>;

    async fn get_problem(&self, id: &str) -> Result<ProblemDetail, ServiceError>;

    async fn create_problem(&self, request: &CreateProblemRequest) -> Result<serde_json::Value, ServiceError>;
}

/// The three collaborators, built once from settings.
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn Catalog>,
    pub evaluator: Arc<dyn Evaluator>,
    pub analyzer: Arc<dyn Analyzer>,
}

impl Backends {
    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        let catalog: Arc<dyn Catalog> = if settings.mock_catalog {
            Arc::new(mock::MockCatalog::new())
        } else {
            Arc::new(http::HttpCatalog::new(&settings.catalog_url, settings.request_timeout_secs)?)
        };

        let evaluator: Arc<dyn Evaluator> = if settings.mock_evaluator {
            Arc::new(mock::MockEvaluator::new())
        } else {
            Arc::new(http::HttpEvaluator::new(&settings.evaluator_url, settings.request_timeout_secs)?)
        };

        let analyzer: Arc<dyn Analyzer> = if settings.mock_analyzer {
            Arc::new(mock::MockAnalyzer::new())
        } else {
            Arc::new(http::HttpAnalyzer::new(&settings.analyzer_url, settings.request_timeout_secs)?)
        };

        info!(
            "Backends ready (catalog: {}, evaluator: {}, analyzer: {})",
            if settings.mock_catalog { "mock" } else { settings.catalog_url.as_str() },
            if settings.mock_evaluator { "mock" } else { settings.evaluator_url.as_str() },
            if settings.mock_analyzer { "mock" } else { settings.analyzer_url.as_str() },
        );

        Ok(Self { catalog, evaluator, analyzer })
    }
}
