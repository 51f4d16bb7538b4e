use std::fmt;
use std::io;
use thiserror::Error;

/// Where a captured worker failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The per-worker initializer returned an error or panicked
    Init,
    /// A work item returned an error
    Work,
    /// A work item panicked with a string payload
    Panic,
    /// A panic whose payload could not be described
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Init => "init",
            FailureKind::Work => "work",
            FailureKind::Panic => "panic",
            FailureKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Description used when a failure carries nothing printable.
pub const UNKNOWN_FAILURE: &str = "Caught unknown exception";

/// A failure captured on a worker thread, buffered until a checked wait drains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl WorkerFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Captures an `anyhow` error with its whole context chain.
    pub fn from_error(kind: FailureKind, err: &anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        if message.is_empty() {
            return Self::new(FailureKind::Unknown, UNKNOWN_FAILURE);
        }
        Self::new(kind, message)
    }

    /// Turns a panic payload caught during `phase` into a failure.
    ///
    /// `&str` and `String` payloads keep their text. A panic in the
    /// initializer stays `Init`; any other phase becomes `Panic`. Payloads
    /// without text are collapsed to [`UNKNOWN_FAILURE`].
    pub fn from_panic(phase: FailureKind, payload: Box<dyn std::any::Any + Send>) -> Self {
        let kind = match phase {
            FailureKind::Init => FailureKind::Init,
            _ => FailureKind::Panic,
        };
        match payload.downcast::<String>() {
            Ok(message) => Self::new(kind, *message),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => Self::new(kind, *message),
                Err(_) => Self::new(FailureKind::Unknown, UNKNOWN_FAILURE),
            },
        }
    }
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Errors returned by the thread pool.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Thread pool must have non-zero size (got {0})")]
    InvalidThreadCount(usize),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to spawn worker thread {index}: {source}")]
    ThreadSpawn {
        index: usize,
        #[source]
        source: io::Error,
    },
    #[error("Error in thread {worker}: {message}")]
    WorkerFailed {
        worker: usize,
        kind: FailureKind,
        message: String,
    },
}

impl PoolError {
    pub(crate) fn worker_failed(worker: usize, failure: WorkerFailure) -> Self {
        PoolError::WorkerFailed {
            worker,
            kind: failure.kind,
            message: failure.message,
        }
    }

    /// Index of the worker a surfaced failure belongs to.
    pub fn worker(&self) -> Option<usize> {
        match self {
            PoolError::WorkerFailed { worker, .. } => Some(*worker),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_from_error_keeps_context_chain() {
        let err = Err::<(), _>(anyhow!("disk full"))
            .context("writing batch")
            .unwrap_err();
        let failure = WorkerFailure::from_error(FailureKind::Work, &err);
        assert_eq!(failure.kind, FailureKind::Work);
        assert_eq!(failure.message, "writing batch: disk full");
    }

    #[test]
    fn test_from_panic_payloads() {
        let failure = WorkerFailure::from_panic(FailureKind::Work, Box::new("static boom"));
        assert_eq!(failure, WorkerFailure::new(FailureKind::Panic, "static boom"));

        let failure =
            WorkerFailure::from_panic(FailureKind::Work, Box::new(String::from("owned boom")));
        assert_eq!(failure, WorkerFailure::new(FailureKind::Panic, "owned boom"));

        let failure = WorkerFailure::from_panic(FailureKind::Work, Box::new(42u32));
        assert_eq!(failure.kind, FailureKind::Unknown);
        assert_eq!(failure.message, UNKNOWN_FAILURE);
    }

    #[test]
    fn test_initializer_panic_keeps_init_kind() {
        let failure = WorkerFailure::from_panic(FailureKind::Init, Box::new("no gpu"));
        assert_eq!(failure, WorkerFailure::new(FailureKind::Init, "no gpu"));

        let failure = WorkerFailure::from_panic(FailureKind::Init, Box::new(42u32));
        assert_eq!(failure.kind, FailureKind::Unknown);
    }

    #[test]
    fn test_worker_failed_carries_index() {
        let err = PoolError::worker_failed(3, WorkerFailure::new(FailureKind::Init, "no device"));
        assert_eq!(err.worker(), Some(3));
        assert_eq!(err.to_string(), "Error in thread 3: no device");
        assert_eq!(PoolError::InvalidThreadCount(0).worker(), None);
    }
}
