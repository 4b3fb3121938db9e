//! Submission result watching.
//!
//! A [`JobWatcher`] polls one evaluator job until it reaches a terminal phase
//! and, the first time it sees `done`, requests feedback from the analyzer.
//! [`WatcherRegistry`] keeps watchers addressable by handle.

pub mod job_watcher;
pub mod poller;
pub mod registry;
pub mod state;
pub mod trigger;

#[cfg(test)]
pub(crate) mod testing;

pub use job_watcher::{JobWatcher, SubmissionContext, UpdateListener};
pub use poller::{clamp_interval, poll_until_terminal, PollControl, StatusTracker, MIN_POLL_INTERVAL_MS};
pub use registry::{UpdateSink, WatcherRegistry, MAX_FINISHED_WATCHERS};
pub use state::{Input, Lifecycle, Outcome, WatcherSnapshot, WatcherState, WatcherUpdate};
pub use trigger::{CompletionTrigger, LatchState};
