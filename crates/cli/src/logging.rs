use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_FILE_PREFIX: &str = "clickhouse-backup";
pub const LOG_FILE_SUFFIX: &str = "log";
/// Days of log files kept next to the current one.
pub const LOG_RETENTION_DAYS: usize = 14;

/// Stderr output filtered by `-v` (or `RUST_LOG`), plus an optional daily
/// log file under `logging.dir`.
pub fn init(verbose: u8, logging: Option<&LoggingConfig>) -> Result<()> {
    let stderr_filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }),
    };
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let file = match logging.and_then(|l| l.dir.as_ref().map(|dir| (dir, l.level.as_deref()))) {
        Some((dir, level)) => {
            let level = LevelFilter::from_str(level.unwrap_or("info"))
                .with_context(|| format!("invalid logging.level {level:?}"))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_appender(dir)?)
                    .with_filter(level),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr)
        .with(file)
        .try_init()
        .context("installing tracing subscriber")
}

/// `clickhouse-backup.<date>.log` in `dir`, rolled at midnight UTC.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating log dir {dir:?}"))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(LOG_RETENTION_DAYS)
        .build(dir)
        .with_context(|| format!("opening log file in {dir:?}"))
}
