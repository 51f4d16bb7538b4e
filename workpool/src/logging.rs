// Logging for workpool
//
// The pool itself only emits `tracing` events; installing a subscriber is
// up to the application. This module offers a ready-made setup on top of
// `tracing-subscriber` for binaries, demos and tests.
//
// ```rust
// use workpool::logging;
//
// // INFO level, human-readable console output
// logging::init_default();
//
// // Or pick the settings explicitly
// let config = logging::LogConfig {
//     level: tracing::Level::DEBUG,
//     json_format: false,
//     ..Default::default()
// };
// logging::init(config);
// ```
//
// Worker threads inherit the dispatcher that was current when the pool was
// built, so a subscriber installed with `tracing::subscriber::set_default`
// in a test also sees the workers' events.

use std::sync::Once;
use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for the logging subscriber
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global subscriber described by `config`.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());

        if let Some(filters) = &config.target_filters {
            for filter in filters.split(',') {
                if let Ok(directive) = filter.parse() {
                    env_filter = env_filter.add_directive(directive);
                }
            }
        }

        let layer = if config.json_format {
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_thread_names(config.show_thread_info)
                .with_thread_ids(config.show_thread_info)
                .boxed()
        } else {
            let fmt_layer = fmt::layer()
                .with_ansi(atty::is(atty::Stream::Stdout))
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_thread_names(config.show_thread_info)
                .with_thread_ids(config.show_thread_info);
            if config.show_time {
                fmt_layer.boxed()
            } else {
                fmt_layer.without_time().boxed()
            }
        };

        let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
        set_global_subscriber(subscriber);
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// INFO level, console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// DEBUG level with pool internals at TRACE.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        target_filters: Some("workpool=trace".to_string()),
        ..Default::default()
    });
}

/// INFO level, JSON lines, no file/line information.
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        show_time: true,
        target_filters: None,
    });
}

/// Warnings and errors only, compact output for test runs.
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    });
}

/// Returns the dispatcher that is current on the calling thread.
///
/// The pool hands this to every worker so that events from worker threads
/// reach the same subscriber as the thread that built the pool.
#[inline]
pub fn current_subscriber() -> tracing::Dispatch {
    tracing::dispatcher::get_default(|d| d.clone())
}

/// Create a span for pool operations
///
/// ```rust
/// let span = workpool::pool_span!("worker", worker = 3);
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! pool_span {
    ($operation:expr) => {
        $crate::logging::debug_span!("pool", operation = $operation)
    };
    ($operation:expr, $($fields:tt)*) => {
        $crate::logging::debug_span!("pool", operation = $operation, $($fields)*)
    };
}

/// Log pool lifecycle events
///
/// ```rust
/// workpool::log_pool!("start", "running", pool_size = 4);
/// ```
#[macro_export]
macro_rules! log_pool {
    ($operation:expr, $status:expr) => {
        $crate::logging::info!(operation = $operation, status = $status);
    };
    ($operation:expr, $status:expr, $($fields:tt)*) => {
        $crate::logging::info!(operation = $operation, status = $status, $($fields)*);
    };
}

pub use tracing::{debug, debug_span, error, info, trace, warn};
