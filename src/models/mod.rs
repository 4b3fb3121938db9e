// Data models (structs)
pub mod analysis;
pub mod job;
pub mod problem;
pub mod settings;

pub use analysis::*;
pub use job::*;
pub use problem::*;
pub use settings::*;
