use std::collections::VecDeque;

use crate::error::WorkerFailure;

/// Per-worker buffers of captured failures.
///
/// Workers only append to their own slot. The controller pops at most one
/// failure per checked wait, always from the lowest-indexed non-empty slot,
/// so the reporting order depends on worker index and never on timing.
#[derive(Debug)]
pub(crate) struct ErrorRegistry {
    slots: Vec<VecDeque<WorkerFailure>>,
}

impl ErrorRegistry {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            slots: (0..workers).map(|_| VecDeque::new()).collect(),
        }
    }

    pub(crate) fn record(&mut self, worker: usize, failure: WorkerFailure) {
        self.slots[worker].push_back(failure);
    }

    /// Removes the oldest failure of the lowest-indexed worker that has one.
    pub(crate) fn take_first(&mut self) -> Option<(usize, WorkerFailure)> {
        self.slots
            .iter_mut()
            .enumerate()
            .find_map(|(worker, slot)| slot.pop_front().map(|failure| (worker, failure)))
    }

    pub(crate) fn pending(&self) -> usize {
        self.slots.iter().map(VecDeque::len).sum()
    }
}
