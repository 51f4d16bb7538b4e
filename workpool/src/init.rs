//! Per-worker initialization hook.
//!
//! Anything a worker thread must do once before it starts taking work
//! (binding to a device, pinning to a CPU set, opening a thread-local handle)
//! is supplied as a [`WorkerInit`] when the pool is built. A failure here does
//! not stop the worker: it is captured into that worker's error registry slot
//! and reported by the next checked wait.

/// Runs once on each worker thread before the worker enters its loop.
pub trait WorkerInit: Send + Sync + 'static {
    fn init(&self, worker: usize) -> anyhow::Result<()>;
}

impl<F> WorkerInit for F
where
    F: Fn(usize) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn init(&self, worker: usize) -> anyhow::Result<()> {
        self(worker)
    }
}

/// Initializer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInit;

impl WorkerInit for NoInit {
    fn init(&self, _worker: usize) -> anyhow::Result<()> {
        Ok(())
    }
}
