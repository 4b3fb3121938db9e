// Problem catalog command handlers - pass-through to the catalog service
use crate::app_state::AppState;
use crate::models::{CreateProblemRequest, ProblemDetail, ProblemSummary};
use std::sync::Arc;
use tauri::State;

#[tauri::command]
pub async fn list_problems(state: State<'_, Arc<AppState>>) -> Result<Vec<ProblemSummary>, String> {
    state
        .catalog()
        .list_problems()
        .await
        .map_err(|e| format!("Failed to load problems: {}", e))
}

#[tauri::command]
pub async fn get_problem(state: State<'_, Arc<AppState>>, problem_id: String) -> Result<ProblemDetail, String> {
    state
        .catalog()
        .get_problem(&problem_id)
        .await
        .map_err(|e| format!("Failed to load problem {}: {}", problem_id, e))
}

#[tauri::command]
pub async fn create_problem(
    state: State<'_, Arc<AppState>>,
    problem: CreateProblemRequest,
) -> Result<serde_json::Value, String> {
    problem.validate()?;
    state
        .catalog()
        .create_problem(&problem)
        .await
        .map_err(|e| format!("Failed to create problem {}: {}", problem.id, e))
}
