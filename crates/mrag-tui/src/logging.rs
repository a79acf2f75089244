use std::fs;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info";

pub fn log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("mrag").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Build the filter: an explicit `--log-level` wins, then `RUST_LOG`, then `info`.
fn build_filter(level: Option<&str>) -> EnvFilter {
    if let Some(level) = level {
        if let Ok(filter) = EnvFilter::try_new(level) {
            return filter;
        }
        eprintln!("Ignoring invalid log level '{}'", level);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// File-only logging. The terminal belongs to the UI, so nothing is written
/// to stdout or stderr once this is installed.
///
/// Keep the returned guard alive for the life of the process or buffered
/// lines are lost.
pub fn init(level: Option<&str>) -> WorkerGuard {
    let log_dir = log_dir();
    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "mrag.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_filter(build_filter(level));

    tracing_subscriber::registry().with(file_layer).init();

    guard
}
