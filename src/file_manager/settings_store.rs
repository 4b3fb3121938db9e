// Settings persistence with partial updates
use super::json_ops::{read_json_file_or_default, write_json_file};
use crate::models::{
    Settings, DEFAULT_ANALYZER_URL, DEFAULT_CATALOG_URL, DEFAULT_EVALUATOR_URL,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::utils::get_settings_json_path;
use log::debug;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsParams {
    pub catalog_url: Option<String>,
    pub evaluator_url: Option<String>,
    pub analyzer_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub mock_catalog: Option<bool>,
    pub mock_evaluator: Option<bool>,
    pub mock_analyzer: Option<bool>,
}

fn url_or_default(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

impl UpdateSettingsParams {
    /// Fields left as `None` keep their current value; an empty URL or a zero
    /// number resets to the default.
    pub fn apply_to(self, current: &mut Settings) {
        if let Some(url) = self.catalog_url {
            current.catalog_url = url_or_default(url, DEFAULT_CATALOG_URL);
        }
        if let Some(url) = self.evaluator_url {
            current.evaluator_url = url_or_default(url, DEFAULT_EVALUATOR_URL);
        }
        if let Some(url) = self.analyzer_url {
            current.analyzer_url = url_or_default(url, DEFAULT_ANALYZER_URL);
        }
        if let Some(interval) = self.poll_interval_ms {
            current.poll_interval_ms = if interval == 0 { DEFAULT_POLL_INTERVAL_MS } else { interval };
        }
        if let Some(timeout) = self.request_timeout_secs {
            current.request_timeout_secs = if timeout == 0 { DEFAULT_REQUEST_TIMEOUT_SECS } else { timeout };
        }
        if let Some(mock) = self.mock_catalog {
            current.mock_catalog = mock;
        }
        if let Some(mock) = self.mock_evaluator {
            current.mock_evaluator = mock;
        }
        if let Some(mock) = self.mock_analyzer {
            current.mock_analyzer = mock;
        }
    }
}

/// Stored settings with environment overrides applied. Overrides are never written back.
pub fn load_settings() -> Result<Settings, String> {
    load_settings_from(&get_settings_json_path())
}

pub fn load_settings_from(path: &Path) -> Result<Settings, String> {
    let stored: Settings = read_json_file_or_default(path)?;
    Ok(stored.with_env_overrides())
}

/// Stored settings with `params` merged in. Nothing is written.
pub fn merge_update(path: &Path, params: UpdateSettingsParams) -> Result<Settings, String> {
    let mut stored: Settings = read_json_file_or_default(path)?;
    params.apply_to(&mut stored);
    Ok(stored)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), String> {
    write_json_file(path, settings)?;
    debug!("Saved settings: {:?}", settings);
    Ok(())
}
