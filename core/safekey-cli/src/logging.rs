//! File logging for the CLI.
//!
//! Writes to `<root>/logs/safekey.log` so stdout stays clean for command output.
//! `RUST_LOG` picks the filter; `SAFEKEY_DEBUG_LOG=1` forces `debug`.

use safekey_core::StorageConfig;
use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "safekey.log";
const DEBUG_ENV: &str = "SAFEKEY_DEBUG_LOG";

/// Installs the global subscriber. Keep the returned guard alive until exit or buffered
/// lines are lost. Returns None when logging couldn't be set up; commands still run.
pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let logs_dir = storage.logs_dir();
    if let Err(e) = fs_err::create_dir_all(&logs_dir) {
        eprintln!("safekey: logging disabled: {}", e);
        return None;
    }

    let file_appender = tracing_appender::rolling::never(&logs_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn filter() -> EnvFilter {
    if debug_enabled(env::var(DEBUG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}
