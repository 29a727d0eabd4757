//! # Logging
//!
//! `tracing` subscriber setup:
//! - daily rotated file in the configured log directory, non-blocking writes
//! - optional compact stderr output
//! - `RUST_LOG` style filtering, default `chat_client=info,warn`
//! - panic hook that records location and message before the default hook runs

pub mod config;

pub use config::LogConfig;

use std::any::Any;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::error::{ChatError, Result};
use config::DEFAULT_FILTER;

/// Install the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the program; dropping
/// it flushes and stops the background writer.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    let stderr_layer = config
        .stderr
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false).compact());

    tracing_subscriber::registry()
        .with(build_filter(&config.log_level))
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| ChatError::Config(format!("Failed to install log subscriber: {e}")))?;

    tracing::info!(
        log_file = %config.log_file().display(),
        log_level = %config.log_level,
        stderr = config.stderr,
        "Logging initialized"
    );

    setup_panic_hook();
    Ok(guard)
}

/// Filter from directives, falling back to the default on a parse error
pub fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("Warning: invalid log filter {directives:?} ({e}), using {DEFAULT_FILTER}");
        EnvFilter::new(DEFAULT_FILTER)
    })
}

fn setup_panic_hook() {
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = panic_message(panic_info.payload());

        tracing::error!(location = %location, message = %message, "Chat client panicked");

        default_panic(panic_info);
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic message".to_string()
    }
}
