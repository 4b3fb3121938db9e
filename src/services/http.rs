// HTTP clients for the judge services (blocking ureq calls on tokio's blocking pool)
use super::{Analyzer, Catalog, Evaluator, ServiceError};
use crate::models::{
    AnalysisRequest, AnalysisResult, CreateProblemRequest, JobStatus, ProblemDetail,
    ProblemSummary, SubmissionCreated, SubmissionPayload, WireAnalysisRequest,
    WireAnalysisResult, WireJobStatus,
};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Shared plumbing: base URL plus a configured agent.
#[derive(Clone)]
struct HttpService {
    agent: ureq::Agent,
    base: Url,
}

impl HttpService {
    fn new(base_url: &str, timeout_secs: u64) -> Result<Self, String> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| format!("Invalid service URL {:?}: {}", base_url, e))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(format!("Unsupported URL scheme: {}", base.scheme()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build();

        Ok(Self { agent, base })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::Transport(format!("Cannot build path on {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T>(&self, segments: &[&str]) -> Result<T, ServiceError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.endpoint(segments)?;
        let agent = self.agent.clone();

        run_blocking(move || {
            debug!("GET {}", url);
            let response = agent.get(url.as_str()).call().map_err(ServiceError::from_ureq)?;
            handle_response(response)
        })
        .await
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: B) -> Result<T, ServiceError>
    where
        B: Serialize + Send + 'static,
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.endpoint(segments)?;
        let agent = self.agent.clone();

        run_blocking(move || {
            debug!("POST {}", url);
            let response = agent
                .post(url.as_str())
                .send_json(&body)
                .map_err(ServiceError::from_ureq)?;
            handle_response(response)
        })
        .await
    }
}

fn handle_response<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ServiceError> {
    response
        .into_json::<T>()
        .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

async fn run_blocking<T, F>(call: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ServiceError::Transport(format!("Request task failed: {}", e)))?
}

// ============= Evaluator =============

pub struct HttpEvaluator {
    service: HttpService,
}

impl HttpEvaluator {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, String> {
        Ok(Self { service: HttpService::new(base_url, timeout_secs)? })
    }
}

#[async_trait::async_trait]
impl Evaluator for HttpEvaluator {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionCreated, ServiceError> {
        let created: SubmissionCreated = self
            .service
            .post_json(&["submissions"], payload.clone())
            .await?;

        if created.submission_id.trim().is_empty() {
            return Err(ServiceError::InvalidResponse("empty submission id".to_string()));
        }
        Ok(created)
    }

    async fn fetch_job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        let wire: WireJobStatus = self.service.get_json(&["submissions", job_id]).await?;
        Ok(wire.into_status(job_id))
    }
}

// ============= Analyzer =============

pub struct HttpAnalyzer {
    service: HttpService,
}

impl HttpAnalyzer {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, String> {
        Ok(Self { service: HttpService::new(base_url, timeout_secs)? })
    }
}

#[async_trait::async_trait]
impl Analyzer for HttpAnalyzer {
    async fn request_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ServiceError> {
        let wire: WireAnalysisResult = self
            .service
            .post_json(&["analysis"], WireAnalysisRequest::from(request))
            .await?;
        wire.into_result().map_err(ServiceError::InvalidResponse)
    }
}

// ============= Catalog =============

pub struct HttpCatalog {
    service: HttpService,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, String> {
        Ok(Self { service: HttpService::new(base_url, timeout_secs)? })
    }
}

#[async_trait::async_trait]
impl Catalog for HttpCatalog {
    async fn list_problems(&self) -> Result<Vec<ProblemSummary>, ServiceError> {
        self.service.get_json(&["problems"]).await
    }

    async fn get_problem(&self, id: &str) -> Result<ProblemDetail, ServiceError> {
        self.service.get_json(&["problems", id]).await
    }

    async fn create_problem(&self, request: &CreateProblemRequest) -> Result<serde_json::Value, ServiceError> {
        request.validate().map_err(ServiceError::InvalidResponse)?;
        self.service.post_json(&["problems"], request.clone()).await
    }
}
