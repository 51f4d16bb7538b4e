//! # Fixed-size Thread Pool
//!
//! A set of OS threads, created once, that take work items from a single
//! FIFO queue. Callers submit work, then block in
//! [`ThreadPool::wait_for_work`] until the queue is drained and every worker
//! is idle.
//!
//! ## Synchronization
//! - One mutex guards the queue, the `running`/`work_complete` flags, the
//!   active-worker count and the error registry
//! - Idle workers wait on a `work_available` condition; each submission wakes
//!   exactly one of them
//! - The controller waits on a `completed` condition, signalled by the worker
//!   that observes the queue empty with no other worker active
//! - Work items run with the lock released
//!
//! ## Failures
//! Errors returned by work items or initializers, and panics, are caught on
//! the worker and buffered per worker index. A checked wait reports at most
//! one of them: the oldest failure of the lowest-indexed worker that has one.

mod registry;
mod state;
mod worker;

pub use state::Work;

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::init::{NoInit, WorkerInit};
use crate::logging;
use state::Shared;
use worker::Worker;

/// Snapshot of the pool's shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Number of worker threads
    pub pool_size: usize,

    /// Work items waiting in the queue
    pub queued: usize,

    /// Workers currently executing a work item or still initializing
    pub active: usize,

    /// Captured failures not yet reported by a checked wait
    pub pending_failures: usize,
}

/// Pool of worker threads executing submitted work items.
///
/// Dropping the pool waits for all submitted work to finish (without
/// reporting failures), then stops and joins every worker.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use workpool::{NoInit, ThreadPool};
///
/// let pool = ThreadPool::new(4, NoInit).unwrap();
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..16 {
///     let counter = counter.clone();
///     pool.submit(move |_worker| {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     });
/// }
/// pool.wait().unwrap();
/// assert_eq!(counter.load(Ordering::SeqCst), 16);
/// ```
pub struct ThreadPool {
    size: usize,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    /// Released only after every worker has been joined
    resource: Option<Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("size", &self.size)
            .field("shared", &self.shared)
            .field("has_resource", &self.resource.is_some())
            .finish()
    }
}

impl ThreadPool {
    /// Creates a pool of `thread_count` workers, each running `init` once
    /// before taking work.
    ///
    /// # Errors
    /// `PoolError::InvalidThreadCount` if `thread_count` is zero, in which
    /// case no thread is spawned. `PoolError::ThreadSpawn` if the OS refuses
    /// a thread; workers spawned so far are stopped and joined first.
    pub fn new<I: WorkerInit>(thread_count: usize, init: I) -> Result<Self> {
        Self::with_config(PoolConfig::with_pool_size(thread_count), init)
    }

    pub fn with_config<I: WorkerInit>(config: PoolConfig, init: I) -> Result<Self> {
        Self::start(config, Arc::new(init), None)
    }

    pub fn builder() -> ThreadPoolBuilder {
        ThreadPoolBuilder::new()
    }

    fn start(
        config: PoolConfig,
        init: Arc<dyn WorkerInit>,
        resource: Option<Box<dyn Any + Send + Sync>>,
    ) -> Result<Self> {
        config.validate()?;

        let size = config.pool_size;
        let shared = Arc::new(Shared::new(size));
        let dispatch = logging::current_subscriber();
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            let worker = Worker::new(index, shared.clone(), init.clone(), dispatch.clone());
            match worker.spawn(&config) {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    error!(index, error = %source, "failed to spawn worker thread");
                    shared.stop();
                    join_all(workers);
                    return Err(PoolError::ThreadSpawn { index, source });
                }
            }
        }

        crate::log_pool!("start", "running", pool_size = size);
        Ok(Self {
            size,
            shared,
            workers,
            resource,
        })
    }

    /// Queues `work` for execution and wakes one idle worker.
    ///
    /// The closure receives the index of the worker that runs it. An `Err`
    /// or a panic is captured on that worker and reported by a later checked
    /// wait.
    pub fn submit<F>(&self, work: F)
    where
        F: FnOnce(usize) -> anyhow::Result<()> + Send + 'static,
    {
        self.shared.push(Box::new(work));
    }

    /// Blocks until every worker has initialized, the queue is empty and no
    /// worker is executing.
    ///
    /// With `check_errors`, reports the oldest captured failure of the
    /// lowest-indexed worker that has one, removing it from the registry.
    /// Further failures stay queued for later calls. Without it, nothing is
    /// reported or removed.
    pub fn wait_for_work(&self, check_errors: bool) -> Result<()> {
        let mut state = self.shared.wait_complete();
        if !check_errors {
            return Ok(());
        }
        match state.errors.take_first() {
            Some((worker, failure)) => Err(PoolError::worker_failed(worker, failure)),
            None => Ok(()),
        }
    }

    /// Same as `wait_for_work(true)`.
    pub fn wait(&self) -> Result<()> {
        self.wait_for_work(true)
    }

    /// Number of worker threads. Never changes after construction.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn metrics(&self) -> PoolMetrics {
        let state = self.shared.lock();
        PoolMetrics {
            pool_size: self.size,
            queued: state.queue.len(),
            active: state.active_count,
            pending_failures: state.errors.pending(),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.shared.wait_complete());

        self.shared.stop();
        join_all(std::mem::take(&mut self.workers));

        if self.resource.take().is_some() {
            debug!("released pool resource");
        }
        crate::log_pool!("shutdown", "completed", pool_size = self.size);
    }
}

fn join_all(workers: Vec<JoinHandle<()>>) {
    for handle in workers {
        let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
        if handle.join().is_err() {
            error!(thread = %name, "worker thread panicked outside a work item");
        }
    }
}

/// Builder for a [`ThreadPool`].
///
/// ```
/// use workpool::ThreadPool;
///
/// let pool = ThreadPool::builder()
///     .pool_size(2)
///     .thread_name_prefix("decoder")
///     .initializer(|worker: usize| -> anyhow::Result<()> {
///         tracing::debug!(worker, "binding worker");
///         Ok(())
///     })
///     .build()
///     .unwrap();
/// assert_eq!(pool.size(), 2);
/// ```
pub struct ThreadPoolBuilder {
    config: PoolConfig,
    init: Arc<dyn WorkerInit>,
    resource: Option<Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ThreadPoolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolBuilder")
            .field("config", &self.config)
            .field("has_resource", &self.resource.is_some())
            .finish()
    }
}

impl Default for ThreadPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadPoolBuilder {
    pub fn new() -> Self {
        Self {
            config: PoolConfig::default(),
            init: Arc::new(NoInit),
            resource: None,
        }
    }

    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.config.pool_size = pool_size;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.config.stack_size = Some(stack_size);
        self
    }

    /// Sets the hook each worker runs once before taking work.
    pub fn initializer<I: WorkerInit>(mut self, init: I) -> Self {
        self.init = Arc::new(init);
        self
    }

    /// Hands the pool a resource that must outlive every worker.
    ///
    /// The value is dropped after all workers are joined, so a guard for a
    /// process-wide runtime (device library, driver session) acquired before
    /// the pool is released only once no worker can still be using it.
    pub fn resource<R: Send + Sync + 'static>(mut self, resource: R) -> Self {
        self.resource = Some(Box::new(resource));
        self
    }

    pub fn build(self) -> Result<ThreadPool> {
        ThreadPool::start(self.config, self.init, self.resource)
    }
}
