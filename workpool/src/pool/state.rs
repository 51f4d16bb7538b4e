use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::WorkerFailure;
use super::registry::ErrorRegistry;

/// A unit of work, called with the index of the worker that runs it.
pub type Work = Box<dyn FnOnce(usize) -> anyhow::Result<()> + Send + 'static>;

/// Everything the controller and the workers share, guarded by one mutex.
pub(crate) struct PoolState {
    pub(crate) queue: VecDeque<Work>,
    pub(crate) running: bool,
    /// Holds `queue.is_empty() && active_count == 0` once a transition completes.
    pub(crate) work_complete: bool,
    pub(crate) active_count: usize,
    pub(crate) errors: ErrorRegistry,
}

/// Lock plus the two conditions the pool waits on.
///
/// * `work_available`: idle workers wait for `!running || !queue.is_empty()`
/// * `completed`: the controller waits for `work_complete`
pub(crate) struct Shared {
    state: Mutex<PoolState>,
    work_available: Condvar,
    completed: Condvar,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Shared")
            .field("queued", &state.queue.len())
            .field("active", &state.active_count)
            .field("running", &state.running)
            .field("work_complete", &state.work_complete)
            .field("pending_failures", &state.errors.pending())
            .finish()
    }
}

impl Shared {
    /// Every worker counts as active until its initializer has run.
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                running: true,
                work_complete: workers == 0,
                active_count: workers,
                errors: ErrorRegistry::new(workers),
            }),
            work_available: Condvar::new(),
            completed: Condvar::new(),
        }
    }

    // No critical section can panic halfway through a state change, so a
    // poisoned lock still guards consistent state.
    pub(crate) fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `work` and wakes one idle worker.
    pub(crate) fn push(&self, work: Work) {
        {
            let mut state = self.lock();
            state.queue.push_back(work);
            state.work_complete = false;
        }
        self.work_available.notify_one();
    }

    /// Blocks until there is work to take or the pool is stopping.
    ///
    /// Returns `None` once the pool has stopped and the queue is drained.
    /// A returned item is already counted as active.
    pub(crate) fn next_work(&self) -> Option<Work> {
        let state = self.lock();
        let mut state = self
            .work_available
            .wait_while(state, |s| s.running && s.queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        let work = state.queue.pop_front()?;
        state.active_count += 1;
        Some(work)
    }

    /// Marks one item, or the initializer, as finished on `worker`, recording
    /// its failure if any.
    pub(crate) fn finish_work(&self, worker: usize, failure: Option<WorkerFailure>) {
        let mut state = self.lock();
        if let Some(failure) = failure {
            state.errors.record(worker, failure);
        }
        state.active_count -= 1;
        if state.queue.is_empty() && state.active_count == 0 {
            state.work_complete = true;
            self.completed.notify_all();
        }
    }

    /// Blocks until the queue is empty and no worker is active.
    pub(crate) fn wait_complete(&self) -> MutexGuard<'_, PoolState> {
        let state = self.lock();
        self.completed
            .wait_while(state, |s| !s.work_complete)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears `running` and wakes every worker so idle ones can exit.
    pub(crate) fn stop(&self) {
        self.lock().running = false;
        self.work_available.notify_all();
    }
}
