// Shared application state: current settings, backends and the watcher registry
use crate::file_manager::{merge_update, save_settings_to, UpdateSettingsParams};
use crate::models::{Settings, SubmissionPayload};
use crate::services::{Backends, Catalog};
use crate::utils::get_settings_json_path;
use crate::watcher::{SubmissionContext, WatcherRegistry};
use log::info;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStarted {
    pub submission_id: String,
    pub handle: String,
}

pub struct AppState {
    settings: RwLock<Settings>,
    backends: RwLock<Backends>,
    pub watchers: WatcherRegistry,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, String> {
        let backends = Backends::from_settings(&settings)?;
        Ok(Self {
            watchers: WatcherRegistry::new(backends.evaluator.clone(), backends.analyzer.clone()),
            settings: RwLock::new(settings),
            backends: RwLock::new(backends),
        })
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn update_settings(&self, params: UpdateSettingsParams) -> Result<Settings, String> {
        self.update_settings_at(&get_settings_json_path(), params)
    }

    /// Merge `params` into the stored settings, rebuild the backends, and only then
    /// write the file. A rejected update leaves both the file and the live state as they were.
    /// Watchers already running keep their collaborators.
    pub fn update_settings_at(&self, path: &Path, params: UpdateSettingsParams) -> Result<Settings, String> {
        let mut current = self.settings.write();

        let stored = merge_update(path, params)?;
        let effective = stored.clone().with_env_overrides();
        let backends = Backends::from_settings(&effective)?;
        save_settings_to(path, &stored)?;

        self.watchers
            .replace_backends(backends.evaluator.clone(), backends.analyzer.clone());
        *self.backends.write() = backends;
        *current = effective.clone();
        info!("Settings updated, backends rebuilt");
        Ok(effective)
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        self.backends.read().catalog.clone()
    }

    /// Submit a solution and start watching the resulting job.
    pub async fn submit_and_watch(&self, payload: SubmissionPayload) -> Result<SubmissionStarted, String> {
        let evaluator = self.backends.read().evaluator.clone();
        let created = evaluator
            .submit(&payload)
            .await
            .map_err(|e| format!("Failed to submit solution: {}", e))?;

        let interval_ms = self.settings.read().poll_interval_ms;
        let context = SubmissionContext {
            problem_id: Some(payload.problem_id),
            source: payload.source,
        };
        let handle = self
            .watchers
            .start_watcher_with_context(&created.submission_id, interval_ms, context);

        info!("Submission {} is being watched as {}", created.submission_id, handle);
        Ok(SubmissionStarted {
            submission_id: created.submission_id,
            handle,
        })
    }

    pub fn start_watcher(&self, job_id: &str) -> String {
        let interval_ms = self.settings.read().poll_interval_ms;
        self.watchers.start_watcher(job_id, interval_ms)
    }
}
