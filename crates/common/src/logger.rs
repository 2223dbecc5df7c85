use crate::error::PinecallError;
use std::path::{Path, PathBuf};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const LOG_FILE_NAME: &str = "pinecall.log";

/// Build the level filter; `RUST_LOG` takes precedence over the configured level.
///
/// The HTTP client stack is noisy at debug, so it is capped at `info` unless
/// `RUST_LOG` says otherwise.
pub fn build_env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},hyper=info,reqwest=info", log_level.to_lowercase()))
    })
}

/// Path of the log file inside `log_dir`
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Initialize logging to the console and to `<log_dir>/pinecall.log`
///
/// Used by the server, whose workflow output is otherwise only visible in
/// server-side logs.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), PinecallError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        PinecallError::config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let path = log_file_path(log_dir);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            PinecallError::config(format!("Failed to open log file {}: {}", path.display(), e))
        })?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(build_env_filter(log_level));

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_filter(build_env_filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PinecallError::internal(format!("Logger already initialized: {}", e)))?;

    tracing::info!("Logging initialized: level={}, log_file={}", log_level, path.display());

    Ok(())
}

/// Console-only logging for one-shot CLI commands
pub fn setup_console_logging(log_level: &str) -> Result<(), PinecallError> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(build_env_filter(log_level))
        .try_init()
        .map_err(|e| PinecallError::internal(format!("Logger already initialized: {}", e)))?;

    tracing::debug!("Console logging initialized: level={}", log_level);

    Ok(())
}
