// Tauri command handlers - one file per domain
pub mod problems;
pub mod settings;
pub mod submissions;
