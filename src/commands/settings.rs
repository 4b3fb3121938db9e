// Settings command handlers - stored in the app data dir, applied to live backends
use crate::app_state::AppState;
use crate::file_manager::UpdateSettingsParams;
use crate::models::Settings;
use std::sync::Arc;
use tauri::State;

/// Effective settings, environment overrides included
#[tauri::command]
pub fn get_settings(state: State<'_, Arc<AppState>>) -> Settings {
    state.settings()
}

/// Update settings with partial update support
#[tauri::command]
pub fn update_settings(
    state: State<'_, Arc<AppState>>,
    settings: UpdateSettingsParams,
) -> Result<Settings, String> {
    state.update_settings(settings)
}
