// Job status poller
// Fetches status until terminal; the next fetch is scheduled only after the previous one resolves

use crate::models::JobStatus;
use crate::services::{Evaluator, ServiceError};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Floor applied to every poll interval so a misconfigured value cannot spin.
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

pub fn clamp_interval(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms.max(MIN_POLL_INTERVAL_MS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// New data, replaces the latest status.
    Accepted,
    /// Identical to what we already hold.
    Unchanged,
    /// Behind the accepted phase, or for another job. Dropped.
    Stale,
}

/// Latest accepted status, applied in phase order rather than arrival order.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    latest: Option<JobStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self { latest: None }
    }

    pub fn latest(&self) -> Option<&JobStatus> {
        self.latest.as_ref()
    }

    pub fn observe(&mut self, incoming: JobStatus) -> Observation {
        if let Some(current) = &self.latest {
            if incoming.job_id != current.job_id {
                return Observation::Stale;
            }
            if *current == incoming {
                return Observation::Unchanged;
            }
            // Terminal values are final; anything else arriving later is stale.
            if current.phase.is_terminal() || incoming.phase.rank() < current.phase.rank() {
                return Observation::Stale;
            }
        }

        self.latest = Some(incoming);
        Observation::Accepted
    }
}

/// Poll `job_id` until `on_result` says to finish.
///
/// Errors are handed to `on_result` as well; they never end the loop by themselves.
/// Cancellation is done by aborting the task running this future.
pub async fn poll_until_terminal<F>(
    evaluator: Arc<dyn Evaluator>,
    job_id: String,
    interval: Duration,
    mut on_result: F,
) where
    F: FnMut(Result<JobStatus, ServiceError>) -> PollControl + Send,
{
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        let result = evaluator.fetch_job_status(&job_id).await;

        match &result {
            Ok(status) => debug!("Poll #{} for job {}: {}", attempt, job_id, status.phase.as_str()),
            Err(e) if e.is_transient() => warn!("Poll #{} for job {} failed, retrying: {}", attempt, job_id, e),
            Err(e) => warn!("Poll #{} for job {} rejected, retrying: {}", attempt, job_id, e),
        }

        if on_result(result) == PollControl::Finish {
            debug!("Stopped polling job {} after {} requests", job_id, attempt);
            return;
        }

        tokio::time::sleep(interval).await;
    }
}
