// Completion trigger
// Fires the analysis request once, the first time a job is seen in `done`

use crate::models::{JobPhase, JobStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LatchState {
    /// No analysis issued yet.
    Open,
    /// Request dispatched, answer pending.
    Dispatched,
    Succeeded,
    Failed,
}

/// One-way latch guarding the analysis request.
///
/// The latch closes when the request is dispatched, not when it resolves, so two
/// `done` observations arriving back to back cannot both issue a request.
#[derive(Debug, Clone)]
pub struct CompletionTrigger {
    latch: LatchState,
    dispatch_count: u32,
}

impl CompletionTrigger {
    pub fn new() -> Self {
        Self {
            latch: LatchState::Open,
            dispatch_count: 0,
        }
    }

    pub fn latch(&self) -> LatchState {
        self.latch
    }

    /// Number of analysis requests issued so far (more than one only after manual retries).
    pub fn dispatch_count(&self) -> u32 {
        self.dispatch_count
    }

    /// Feed an accepted status. Returns true when the caller must dispatch analysis now.
    pub fn observe(&mut self, status: &JobStatus) -> bool {
        if status.phase != JobPhase::Done || self.latch != LatchState::Open {
            return false;
        }

        self.latch = LatchState::Dispatched;
        self.dispatch_count += 1;
        true
    }

    /// Record the outcome of the in-flight request. Ignored unless one is in flight.
    pub fn resolve(&mut self, succeeded: bool) -> bool {
        if self.latch != LatchState::Dispatched {
            return false;
        }

        self.latch = if succeeded {
            LatchState::Succeeded
        } else {
            LatchState::Failed
        };
        true
    }

    /// Explicit manual retry: only a failed request can be issued again.
    pub fn rearm(&mut self) -> bool {
        if self.latch != LatchState::Failed {
            return false;
        }

        self.latch = LatchState::Dispatched;
        self.dispatch_count += 1;
        true
    }
}

impl Default for CompletionTrigger {
    fn default() -> Self {
        Self::new()
    }
}
