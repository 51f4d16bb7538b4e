use crate::error::{PoolError, Result};

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "workpool-worker";

/// Configuration for a [`ThreadPool`](crate::ThreadPool).
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of worker threads, fixed for the pool's lifetime.
    pub pool_size: usize,

    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,

    /// Stack size for each worker thread. `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: num_cpus::get(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    /// Default configuration with an explicit worker count.
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(PoolError::InvalidThreadCount(self.pool_size));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(PoolError::ConfigError(
                "thread name prefix must not be empty".to_string(),
            ));
        }
        if self.stack_size == Some(0) {
            return Err(PoolError::ConfigError(
                "stack size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn thread_name(&self, index: usize) -> String {
        format!("{}-{}", self.thread_name_prefix, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_name() {
        let config = PoolConfig {
            thread_name_prefix: "decoder".to_string(),
            ..PoolConfig::with_pool_size(2)
        };
        assert_eq!(config.thread_name(1), "decoder-1");
    }

    #[test]
    fn test_validate() {
        assert!(PoolConfig::with_pool_size(1).validate().is_ok());
        assert!(matches!(
            PoolConfig::with_pool_size(0).validate(),
            Err(PoolError::InvalidThreadCount(0))
        ));

        let config = PoolConfig {
            stack_size: Some(0),
            ..PoolConfig::with_pool_size(1)
        };
        assert!(matches!(config.validate(), Err(PoolError::ConfigError(_))));
    }
}
