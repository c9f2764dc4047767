//! Logging setup.
//!
//! Every session writes to `routefindr.log` in the log directory, truncated on
//! start. Headless runs also log to stderr; the TUI owns the terminal so it
//! only gets the file. `RUST_LOG` overrides the default `info` filter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "routefindr.log";

/// Keeps the background log writer alive. Dropping it flushes the file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Default log directory: the platform cache dir, or `./logs` without one.
pub fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("routefindr"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Create the directory and truncate the log file.
fn prepare_log_file(log_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE);
    fs::write(&path, "")?;
    Ok(path)
}

pub fn init_logging(log_dir: &Path, console: bool) -> io::Result<LoggingGuard> {
    prepare_log_file(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(false);

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .compact()
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
