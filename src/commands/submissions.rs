// Submission command handlers - submit code and follow the result
use crate::app_state::{AppState, SubmissionStarted};
use crate::models::{AnalysisResult, JobStatus, SubmissionPayload};
use crate::watcher::{UpdateSink, WatcherSnapshot, WatcherUpdate};
use log::warn;
use serde::Serialize;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, State};

pub const SUBMISSION_UPDATE_EVENT: &str = "submission:update";

#[derive(Serialize)]
struct SubmissionUpdateEvent<'a> {
    handle: &'a str,
    #[serde(flatten)]
    update: &'a WatcherUpdate,
}

/// Forwards every watcher update to the frontend.
pub fn update_sink(app: AppHandle) -> UpdateSink {
    Arc::new(move |handle: &str, update: &WatcherUpdate| {
        let event = SubmissionUpdateEvent { handle, update };
        if let Err(e) = app.emit(SUBMISSION_UPDATE_EVENT, &event) {
            warn!("Failed to emit {}: {}", SUBMISSION_UPDATE_EVENT, e);
        }
    })
}

/// Submit a solution and start watching it; updates arrive as `submission:update` events
#[tauri::command]
pub async fn submit_solution(
    state: State<'_, Arc<AppState>>,
    payload: SubmissionPayload,
) -> Result<SubmissionStarted, String> {
    if payload.source.trim().is_empty() {
        return Err("Source code is empty".to_string());
    }

    state.submit_and_watch(payload).await
}

/// Watch an existing job id
#[tauri::command]
pub async fn start_watcher(
    state: State<'_, Arc<AppState>>,
    job_id: String,
) -> Result<String, String> {
    if job_id.trim().is_empty() {
        return Err("Job id is empty".to_string());
    }

    Ok(state.start_watcher(&job_id))
}

#[tauri::command]
pub fn get_current_status(state: State<'_, Arc<AppState>>, handle: String) -> Option<JobStatus> {
    state.watchers.current_status(&handle)
}

#[tauri::command]
pub fn get_analysis(state: State<'_, Arc<AppState>>, handle: String) -> Option<AnalysisResult> {
    state.watchers.analysis(&handle)
}

#[tauri::command]
pub fn get_watcher_snapshot(state: State<'_, Arc<AppState>>, handle: String) -> Option<WatcherSnapshot> {
    state.watchers.snapshot(&handle)
}

#[tauri::command]
pub async fn retry_analysis(state: State<'_, Arc<AppState>>, handle: String) -> Result<bool, String> {
    Ok(state.watchers.retry_analysis(&handle))
}

#[tauri::command]
pub fn stop_watcher(state: State<'_, Arc<AppState>>, handle: String) {
    state.watchers.remove(&handle);
}
