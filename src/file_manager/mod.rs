// JSON persistence helpers
pub mod json_ops;
pub mod settings_store;

pub use json_ops::*;
pub use settings_store::{load_settings, merge_update, save_settings_to, UpdateSettingsParams};
