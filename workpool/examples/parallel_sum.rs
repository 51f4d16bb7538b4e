// Splits a range into chunks, sums them on a pool and reports any chunk
// that fails validation.
//
// Run with: cargo run --example parallel_sum

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use workpool::{logging, PoolError, ThreadPool};

const CHUNK: u64 = 10_000;
const CHUNKS: u64 = 32;

/// Stands in for a process-wide runtime session that must outlive the workers.
struct Session;

impl Drop for Session {
    fn drop(&mut self) {
        tracing::info!("session closed");
    }
}

fn main() -> anyhow::Result<()> {
    logging::init_development();

    let pool = ThreadPool::builder()
        .pool_size(4)
        .thread_name_prefix("summer")
        .initializer(|worker: usize| -> anyhow::Result<()> {
            tracing::debug!(worker, "worker bound");
            Ok(())
        })
        .resource(Session)
        .build()
        .context("building pool")?;

    let total = Arc::new(AtomicU64::new(0));
    for chunk in 0..CHUNKS {
        let total = total.clone();
        pool.submit(move |worker| {
            let start = chunk * CHUNK;
            let sum: u64 = (start..start + CHUNK).sum();
            tracing::trace!(worker, chunk, sum, "chunk summed");
            total.fetch_add(sum, Ordering::Relaxed);
            Ok(())
        });
    }
    pool.wait().context("summing chunks")?;

    let expected: u64 = (0..CHUNK * CHUNKS).sum();
    tracing::info!(total = total.load(Ordering::Relaxed), expected, "sum complete");

    // Every third chunk is rejected; failures come back one per wait.
    for chunk in 0..9u64 {
        pool.submit(move |_| {
            if chunk % 3 == 0 {
                bail!("chunk {} rejected", chunk);
            }
            Ok(())
        });
    }
    loop {
        match pool.wait() {
            Ok(()) => break,
            Err(PoolError::WorkerFailed { worker, message, .. }) => {
                tracing::warn!(worker, %message, "validation failed");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
