// workpool
//
// A fixed-size pool of worker threads with a blocking wait for completion
// and per-worker failure capture.
//
// Work items are closures taking the index of the worker that runs them.
// Each worker runs an injected initializer once before taking work, which is
// where device binding or CPU pinning belongs. Failures never cross threads
// when they happen: they are buffered per worker and reported one at a time
// by checked waits, lowest worker index first.

pub mod config;
pub mod error;
pub mod init;
pub mod logging;
pub mod pool;

pub use config::PoolConfig;
pub use error::{FailureKind, PoolError, Result, WorkerFailure};
pub use init::{NoInit, WorkerInit};
pub use pool::{PoolMetrics, ThreadPool, ThreadPoolBuilder, Work};
