//! File logging for host processes. Stdout stays free for the host's own
//! protocol.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "clojure_tools=debug,nrepl_protocol=debug";

/// `LOG_DIR` if set, else `~/.clojure-tools/logs`.
pub fn log_dir() -> PathBuf {
    log_dir_from(std::env::var("LOG_DIR").ok())
}

fn log_dir_from(configured: Option<String>) -> PathBuf {
    match configured {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".clojure-tools")
            .join("logs"),
    }
}

/// Install a global subscriber writing to `<log_dir>/<prefix>.log`.
///
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn init_file_logging(prefix: &str) -> Result<WorkerGuard> {
    init_file_logging_in(&log_dir(), prefix)
}

pub fn init_file_logging_in(dir: &Path, prefix: &str) -> Result<WorkerGuard> {
    let file_appender = Builder::new()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging to {}", dir.display());
    info!("RUST_LOG environment: {:?}", std::env::var("RUST_LOG"));
    Ok(guard)
}
