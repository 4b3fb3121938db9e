// Settings data models
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATALOG_URL: &str = "http://localhost:8081";
pub const DEFAULT_EVALUATOR_URL: &str = "http://localhost:8082";
pub const DEFAULT_ANALYZER_URL: &str = "http://localhost:8083";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 800;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const ENV_CATALOG_URL: &str = "CODEJUDGE_API_PM";
pub const ENV_EVALUATOR_URL: &str = "CODEJUDGE_API_EVAL";
pub const ENV_ANALYZER_URL: &str = "CODEJUDGE_API_ANALYZER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub catalog_url: String,
    pub evaluator_url: String,
    pub analyzer_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub mock_catalog: bool,
    #[serde(default)]
    pub mock_evaluator: bool,
    #[serde(default)]
    pub mock_analyzer: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_url: String::from(DEFAULT_CATALOG_URL),
            evaluator_url: String::from(DEFAULT_EVALUATOR_URL),
            analyzer_url: String::from(DEFAULT_ANALYZER_URL),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            mock_catalog: false,
            mock_evaluator: false,
            mock_analyzer: false,
        }
    }
}

impl Settings {
    /// Apply service URL overrides from the environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = pick(ENV_CATALOG_URL) {
            self.catalog_url = url;
        }
        if let Some(url) = pick(ENV_EVALUATOR_URL) {
            self.evaluator_url = url;
        }
        if let Some(url) = pick(ENV_ANALYZER_URL) {
            self.analyzer_url = url;
        }
        self
    }
}
