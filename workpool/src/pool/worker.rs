use std::fmt;
use std::io;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use crate::config::PoolConfig;
use crate::error::{FailureKind, UNKNOWN_FAILURE, WorkerFailure};
use crate::init::WorkerInit;
use super::state::{Shared, Work};

/// One pool thread.
///
/// Runs the initializer once, then loops: take the head of the queue, run it
/// outside the lock, report completion. Failures of either step are captured
/// into this worker's registry slot and never leave the thread.
pub(crate) struct Worker {
    index: usize,
    shared: Arc<Shared>,
    init: Arc<dyn WorkerInit>,
    dispatch: tracing::Dispatch,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker").field("index", &self.index).finish()
    }
}

impl Worker {
    pub(crate) fn new(
        index: usize,
        shared: Arc<Shared>,
        init: Arc<dyn WorkerInit>,
        dispatch: tracing::Dispatch,
    ) -> Self {
        Self {
            index,
            shared,
            init,
            dispatch,
        }
    }

    pub(crate) fn spawn(self, config: &PoolConfig) -> io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(config.thread_name(self.index));
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder.spawn(move || self.run())
    }

    fn run(self) {
        let _dispatch = tracing::dispatcher::set_default(&self.dispatch);
        let span = crate::pool_span!("worker", worker = self.index);
        let _entered = span.enter();

        debug!("worker started");
        self.initialize();

        while let Some(work) = self.shared.next_work() {
            let failure = self.execute(work);
            self.shared.finish_work(self.index, failure);
        }
        debug!("worker stopped");
    }

    // Leaves the initializing state through the same path as a finished item.
    fn initialize(&self) {
        let failure = capture(FailureKind::Init, || self.init.init(self.index));
        if let Some(failure) = &failure {
            warn!(kind = %failure.kind, error = %failure.message, "worker initialization failed");
        }
        self.shared.finish_work(self.index, failure);
    }

    fn execute(&self, work: Work) -> Option<WorkerFailure> {
        trace!("executing work item");
        let index = self.index;
        let failure = capture(FailureKind::Work, move || work(index));
        if let Some(failure) = &failure {
            debug!(kind = %failure.kind, error = %failure.message, "work item failed");
        }
        failure
    }
}

/// Runs `f` during `phase` and describes whatever went wrong.
///
/// The error is formatted and dropped inside the unwind guard, so a panic
/// from its `Display` or `Drop` is captured like any other.
fn capture<F>(phase: FailureKind, f: F) -> Option<WorkerFailure>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(move || match f() {
        Ok(()) => None,
        Err(err) => Some(WorkerFailure::from_error(phase, &err)),
    }));
    match result {
        Ok(failure) => failure,
        Err(payload) => Some(describe_panic(phase, payload)),
    }
}

// Dropping a payload runs arbitrary code too. A payload that panics again is
// leaked.
fn describe_panic(phase: FailureKind, payload: Box<dyn std::any::Any + Send>) -> WorkerFailure {
    panic::catch_unwind(AssertUnwindSafe(move || WorkerFailure::from_panic(phase, payload)))
        .unwrap_or_else(|payload| {
            mem::forget(payload);
            WorkerFailure::new(FailureKind::Unknown, UNKNOWN_FAILURE)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[derive(Debug)]
    struct Unprintable;

    impl fmt::Display for Unprintable {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("display exploded")
        }
    }

    impl std::error::Error for Unprintable {}

    struct LoudPayload;

    impl Drop for LoudPayload {
        fn drop(&mut self) {
            panic!("payload drop exploded");
        }
    }

    #[test]
    fn test_capture() {
        assert!(capture(FailureKind::Work, || Ok(())).is_none());

        let failure = capture(FailureKind::Init, || Err(anyhow!("no device"))).unwrap();
        assert_eq!(failure, WorkerFailure::new(FailureKind::Init, "no device"));

        let failure = capture(FailureKind::Work, || panic!("exploded")).unwrap();
        assert_eq!(failure, WorkerFailure::new(FailureKind::Panic, "exploded"));

        let failure = capture(FailureKind::Init, || panic!("no gpu")).unwrap();
        assert_eq!(failure, WorkerFailure::new(FailureKind::Init, "no gpu"));
    }

    #[test]
    fn test_capture_survives_panicking_display() {
        let failure = capture(FailureKind::Work, || Err(anyhow::Error::new(Unprintable))).unwrap();
        assert_eq!(failure, WorkerFailure::new(FailureKind::Panic, "display exploded"));
    }

    #[test]
    fn test_panicking_payload_drop_becomes_unknown() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(LoudPayload);
        let failure = describe_panic(FailureKind::Work, payload);
        assert_eq!(failure, WorkerFailure::new(FailureKind::Unknown, UNKNOWN_FAILURE));
    }

    #[test]
    fn test_worker_drains_queue_then_exits() {
        let shared = Arc::new(Shared::new(1));
        shared.push(Box::new(|_| Ok(())));
        shared.push(Box::new(|worker| Err(anyhow!("failed on {}", worker))));
        shared.stop();

        let worker = Worker::new(
            0,
            shared.clone(),
            Arc::new(crate::init::NoInit),
            tracing::Dispatch::none(),
        );
        let handle = worker.spawn(&PoolConfig::with_pool_size(1)).unwrap();
        handle.join().unwrap();

        let mut state = shared.lock();
        assert!(state.queue.is_empty());
        assert_eq!(state.active_count, 0);
        assert!(state.work_complete);
        assert_eq!(
            state.errors.take_first(),
            Some((0, WorkerFailure::new(FailureKind::Work, "failed on 0")))
        );
    }
}
