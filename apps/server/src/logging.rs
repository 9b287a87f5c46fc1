//! Logging initialization for the server binary.
//!
//! Supports JSON or human-readable output, optional daily-rotated file
//! logging, and `RUST_LOG` environment overrides of the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the non-blocking file writer alive for the program duration.
/// Dropping it flushes buffered log lines.
pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LogGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let file_guard = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender =
                tracing_appender::rolling::daily(directory, format!("{}.log", config.service_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);

            if config.json {
                registry
                    .with(fmt::layer().json().with_current_span(false))
                    .with(fmt::layer().json().with_writer(writer).with_ansi(false))
                    .init();
            } else {
                registry
                    .with(fmt::layer())
                    .with(fmt::layer().with_writer(writer).with_ansi(false))
                    .init();
            }
            Some(guard)
        }
        None => {
            if config.json {
                registry
                    .with(fmt::layer().json().with_current_span(false))
                    .init();
            } else {
                registry.with(fmt::layer()).init();
            }
            None
        }
    };

    tracing::info!(
        service_name = %config.service_name,
        json = config.json,
        "Logging initialized"
    );

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
