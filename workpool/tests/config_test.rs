// Integration tests for workpool::config and error display

use std::io;

use workpool::config::DEFAULT_THREAD_NAME_PREFIX;
use workpool::{logging, FailureKind, NoInit, PoolConfig, PoolError, ThreadPool};

#[test]
fn test_pool_config_defaults() {
    logging::init_test();
    let config = PoolConfig::default();

    assert_eq!(config.pool_size, num_cpus::get());
    assert_eq!(config.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);
    assert!(config.stack_size.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_with_config_uses_pool_size() {
    logging::init_test();
    let config = PoolConfig {
        stack_size: Some(256 * 1024),
        ..PoolConfig::with_pool_size(3)
    };
    let pool = ThreadPool::with_config(config, NoInit).unwrap();
    assert_eq!(pool.size(), 3);
    pool.submit(|_| Ok(()));
    pool.wait().unwrap();
}

#[test]
fn test_builder_rejects_invalid_config() {
    logging::init_test();
    let result = ThreadPool::builder().pool_size(0).build();
    assert!(matches!(result, Err(PoolError::InvalidThreadCount(0))));

    let result = ThreadPool::builder()
        .pool_size(2)
        .thread_name_prefix("")
        .build();
    assert!(matches!(result, Err(PoolError::ConfigError(_))));
}

#[test]
fn test_builder_config_then_override() {
    logging::init_test();
    let pool = ThreadPool::builder()
        .config(PoolConfig::with_pool_size(8))
        .pool_size(2)
        .build()
        .unwrap();
    assert_eq!(pool.size(), 2);
}

#[test]
fn test_pool_error_display() {
    logging::init_test();
    assert_eq!(
        PoolError::InvalidThreadCount(0).to_string(),
        "Thread pool must have non-zero size (got 0)"
    );
    assert_eq!(
        PoolError::ConfigError("bad prefix".to_string()).to_string(),
        "Configuration error: bad prefix"
    );
    let spawn = PoolError::ThreadSpawn {
        index: 2,
        source: io::Error::new(io::ErrorKind::Other, "out of threads"),
    };
    assert_eq!(spawn.to_string(), "Failed to spawn worker thread 2: out of threads");
    assert!(std::error::Error::source(&spawn).is_some());

    let failed = PoolError::WorkerFailed {
        worker: 1,
        kind: FailureKind::Work,
        message: "boom".to_string(),
    };
    assert_eq!(failed.to_string(), "Error in thread 1: boom");
}

#[test]
fn test_pool_debug_format() {
    logging::init_test();
    let pool = ThreadPool::new(2, NoInit).unwrap();
    let debug = format!("{:?}", pool);
    assert!(debug.contains("ThreadPool"));
    assert!(debug.contains("size: 2"));
    assert!(format!("{:?}", ThreadPool::builder()).contains("pool_size"));
}
