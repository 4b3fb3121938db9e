// Watcher registry
// Addresses watchers by opaque handle so the frontend never holds them directly

use super::job_watcher::{JobWatcher, SubmissionContext};
use super::state::{WatcherSnapshot, WatcherUpdate};
use crate::models::{AnalysisResult, JobStatus};
use crate::services::{Analyzer, Evaluator};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Finished watchers kept around so their last status and analysis stay readable.
pub const MAX_FINISHED_WATCHERS: usize = 16;

#[derive(Clone)]
struct Collaborators {
    evaluator: Arc<dyn Evaluator>,
    analyzer: Arc<dyn Analyzer>,
}

/// Receives every update of every watcher, tagged with the watcher's handle.
pub type UpdateSink = Arc<dyn Fn(&str, &WatcherUpdate) + Send + Sync>;

struct Entry {
    watcher: Arc<JobWatcher>,
    seq: u64,
}

#[derive(Default)]
struct Slots {
    next_seq: u64,
    entries: HashMap<String, Entry>,
}

impl Slots {
    /// Drop the oldest finished entries beyond `keep`. Running watchers are never touched.
    fn evict_finished(&mut self, keep: usize) -> Vec<Arc<JobWatcher>> {
        let mut finished: Vec<(u64, String)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.watcher.is_finished())
            .map(|(handle, entry)| (entry.seq, handle.clone()))
            .collect();
        if finished.len() <= keep {
            return Vec::new();
        }

        finished.sort_unstable();
        let excess = finished.len() - keep;
        finished
            .into_iter()
            .take(excess)
            .filter_map(|(_, handle)| {
                debug!("Evicting finished watcher {}", handle);
                self.entries.remove(&handle).map(|entry| entry.watcher)
            })
            .collect()
    }
}

// Evictions can happen from inside another watcher's listener, which holds that
// watcher's delivery lock; the last reference must not be dropped there.
fn release(watchers: Vec<Arc<JobWatcher>>) {
    if watchers.is_empty() {
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move { drop(watchers) });
        }
        Err(_) => drop(watchers),
    }
}

pub struct WatcherRegistry {
    collaborators: RwLock<Collaborators>,
    sink: RwLock<Option<UpdateSink>>,
    slots: Arc<Mutex<Slots>>,
    max_finished: usize,
}

impl WatcherRegistry {
    pub fn new(evaluator: Arc<dyn Evaluator>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            collaborators: RwLock::new(Collaborators { evaluator, analyzer }),
            sink: RwLock::new(None),
            slots: Arc::new(Mutex::new(Slots::default())),
            max_finished: MAX_FINISHED_WATCHERS,
        }
    }

    pub fn with_finished_limit(mut self, keep: usize) -> Self {
        self.max_finished = keep;
        self
    }

    /// Swap the collaborators used by watchers started from now on.
    /// Running watchers keep the ones they were created with.
    pub fn replace_backends(&self, evaluator: Arc<dyn Evaluator>, analyzer: Arc<dyn Analyzer>) {
        *self.collaborators.write() = Collaborators { evaluator, analyzer };
    }

    /// Attached to watchers started from now on, before their first fetch.
    pub fn set_update_sink(&self, sink: UpdateSink) {
        *self.sink.write() = Some(sink);
    }

    pub fn start_watcher(&self, job_id: &str, interval_ms: u64) -> String {
        self.start_watcher_with_context(job_id, interval_ms, SubmissionContext::default())
    }

    /// Must be called from within a tokio runtime. A watcher already registered for
    /// the same job is stopped and its handle forgotten.
    pub fn start_watcher_with_context(&self, job_id: &str, interval_ms: u64, context: SubmissionContext) -> String {
        let collaborators = self.collaborators.read().clone();
        let watcher = JobWatcher::new(
            job_id,
            interval_ms,
            context,
            collaborators.evaluator,
            collaborators.analyzer,
        );

        let handle = uuid::Uuid::new_v4().to_string();
        if let Some(sink) = self.sink.read().clone() {
            let sink_handle = handle.clone();
            watcher.on_update(move |update| sink(&sink_handle, update));
        }

        let slots: Weak<Mutex<Slots>> = Arc::downgrade(&self.slots);
        let keep = self.max_finished;
        watcher.on_update(move |_| {
            if let Some(slots) = slots.upgrade() {
                let evicted = slots.lock().evict_finished(keep);
                release(evicted);
            }
        });

        let watcher = Arc::new(watcher);
        let (replaced, evicted) = {
            let mut slots = self.slots.lock();
            let replaced: Vec<Arc<JobWatcher>> = {
                let stale: Vec<String> = slots
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.watcher.job_id() == job_id)
                    .map(|(handle, _)| handle.clone())
                    .collect();
                stale
                    .into_iter()
                    .filter_map(|handle| slots.entries.remove(&handle).map(|entry| entry.watcher))
                    .collect()
            };

            let seq = slots.next_seq;
            slots.next_seq += 1;
            slots.entries.insert(handle.clone(), Entry { watcher: watcher.clone(), seq });
            (replaced, slots.evict_finished(self.max_finished))
        };

        for old in &replaced {
            info!("Replacing watcher for job {}", old.job_id());
            old.stop();
        }
        release(replaced);
        release(evicted);

        watcher.start();
        info!("Started watcher {} for job {}", handle, job_id);
        handle
    }

    fn get(&self, handle: &str) -> Option<Arc<JobWatcher>> {
        self.slots.lock().entries.get(handle).map(|entry| entry.watcher.clone())
    }

    pub fn current_status(&self, handle: &str) -> Option<JobStatus> {
        self.get(handle)?.current_status()
    }

    pub fn analysis(&self, handle: &str) -> Option<AnalysisResult> {
        self.get(handle)?.analysis()
    }

    pub fn snapshot(&self, handle: &str) -> Option<WatcherSnapshot> {
        self.get(handle).map(|watcher| watcher.snapshot())
    }

    /// Returns false for an unknown handle.
    pub fn on_update<F>(&self, handle: &str, listener: F) -> bool
    where
        F: Fn(&WatcherUpdate) + Send + Sync + 'static,
    {
        match self.get(handle) {
            Some(watcher) => {
                watcher.on_update(listener);
                true
            }
            None => false,
        }
    }

    pub fn stop(&self, handle: &str) {
        match self.get(handle) {
            Some(watcher) => {
                watcher.stop();
                let evicted = self.slots.lock().evict_finished(self.max_finished);
                release(evicted);
            }
            None => debug!("stop: unknown watcher {}", handle),
        }
    }

    pub fn retry_analysis(&self, handle: &str) -> bool {
        self.get(handle).map_or(false, |watcher| watcher.retry_analysis())
    }

    /// Stop the watcher and forget its handle.
    pub fn remove(&self, handle: &str) -> bool {
        let removed = self.slots.lock().entries.remove(handle);
        match removed {
            Some(entry) => {
                entry.watcher.stop();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let watchers: Vec<Arc<JobWatcher>> = self
            .slots
            .lock()
            .entries
            .drain()
            .map(|(_, entry)| entry.watcher)
            .collect();
        if !watchers.is_empty() {
            info!("Stopping {} watcher(s)", watchers.len());
        }
        for watcher in watchers {
            watcher.stop();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().entries.is_empty()
    }
}

impl Drop for WatcherRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}
