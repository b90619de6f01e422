//! Tracing setup for the reporting binary.
//!
//! Console output goes to stderr; stdout carries only the JSON report.
//! With `file_logs` on, a daily-rotating `mastery.log` is written under
//! `log_dir` as well.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_NAME: &str = "mastery.log";

/// Keeps the non-blocking file writer alive; drop it only at shutdown.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// An unparsable filter falls back to `info`.
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(console_layer);

    if !config.file_logs {
        registry.init();
        return None;
    }

    match file_writer(&config.log_dir) {
        Ok((file_writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);
            registry.with(file_layer).init();
            Some(FileLogGuard { _guard: guard })
        }
        Err(err) => {
            registry.init();
            tracing::warn!(
                log_dir = %config.log_dir.display(),
                error = %err,
                "file logging disabled, could not create log directory"
            );
            None
        }
    }
}

fn file_writer(
    log_dir: &Path,
) -> std::io::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_NAME);
    Ok(tracing_appender::non_blocking(appender))
}
