pub mod app_state;
#[cfg(feature = "desktop")]
mod commands;
pub mod file_manager;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;
pub mod watcher;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use crate::app_state::AppState;
    use crate::commands::{
        problems::{create_problem, get_problem, list_problems},
        settings::{get_settings, update_settings},
        submissions::{
            get_analysis, get_current_status, get_watcher_snapshot, retry_analysis, start_watcher,
            stop_watcher, submit_solution, update_sink,
        },
    };
    use crate::file_manager::{initialize_json_file, load_settings};
    use crate::logging::cleanup_old_logs;
    use crate::models::Settings;
    use crate::utils::{get_settings_json_path, initialize_data_directories};
    use log::{error, info};
    use std::sync::Arc;
    use tauri::{Manager, RunEvent};

    fn initialize_app_data() -> Result<(), String> {
        initialize_data_directories()?;
        initialize_json_file(&get_settings_json_path(), &Settings::default())?;
        Ok(())
    }

    fn build_state() -> Result<Arc<AppState>, String> {
        let settings = load_settings().unwrap_or_else(|e| {
            error!("Failed to load settings, using defaults: {}", e);
            Settings::default().with_env_overrides()
        });

        let state = AppState::new(settings).or_else(|e| {
            error!("Invalid service settings ({}), falling back to local mocks", e);
            AppState::new(Settings {
                mock_catalog: true,
                mock_evaluator: true,
                mock_analyzer: true,
                ..Settings::default()
            })
        });

        state.map(Arc::new)
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        if let Err(e) = initialize_app_data() {
            eprintln!("Failed to initialize app data: {}", e);
        }

        tauri::Builder::default()
            .plugin(crate::logging::plugin())
            .setup(|app| {
                cleanup_old_logs();

                let state = build_state()?;
                state.watchers.set_update_sink(update_sink(app.handle().clone()));
                app.manage(state);

                info!("CodeJudge {} started", app.package_info().version);
                Ok(())
            })
            .invoke_handler(tauri::generate_handler![
                list_problems,
                get_problem,
                create_problem,
                submit_solution,
                start_watcher,
                get_current_status,
                get_analysis,
                get_watcher_snapshot,
                retry_analysis,
                stop_watcher,
                get_settings,
                update_settings,
            ])
            .build(tauri::generate_context!())
            .expect("error while building tauri application")
            .run(|app, event| {
                if let RunEvent::Exit = event {
                    if let Some(state) = app.try_state::<Arc<AppState>>() {
                        state.watchers.stop_all();
                    }
                }
            });
    }
}
