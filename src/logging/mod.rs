//! Logging setup for CodeJudge
//! Log files live in the app data `logs` directory with 7-day retention

use log::info;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

const LOG_RETENTION_DAYS: u64 = 7;
pub const LOG_FILE_NAME: &str = "codejudge";

pub fn cleanup_old_logs() {
    cleanup_logs_in(&crate::utils::get_logs_dir(), SystemTime::now());
}

/// Remove `.log` files in `dir` older than the retention window. Returns how many were removed.
pub(crate) fn cleanup_logs_in(dir: &Path, now: SystemTime) -> usize {
    let retention = Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "log") {
            continue;
        }

        let age = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if age.map_or(false, |age| age > retention) && fs::remove_file(&path).is_ok() {
            info!("Cleaned up old log: {:?}", path.file_name());
            removed += 1;
        }
    }
    removed
}

/// Log plugin writing to stdout and to the app's `logs` directory.
#[cfg(feature = "desktop")]
pub fn plugin<R: tauri::Runtime>() -> tauri::plugin::TauriPlugin<R> {
    use tauri_plugin_log::{Target, TargetKind};

    tauri_plugin_log::Builder::new()
        .level(log::LevelFilter::Info)
        .level_for("codejudge_lib", log::LevelFilter::Debug)
        .targets([
            Target::new(TargetKind::Stdout),
            Target::new(TargetKind::Folder {
                path: crate::utils::get_logs_dir(),
                file_name: Some(LOG_FILE_NAME.to_string()),
            }),
        ])
        .build()
}
