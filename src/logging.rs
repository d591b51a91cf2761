//! File-based logging.
//!
//! The terminal belongs to the UI, so log records only ever go to rotating
//! files in the log directory.  Records are written as `key=value` pairs
//! beginning with `event=`.
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOG_FILE_BASENAME: &str = "dailycal";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 2 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

#[derive(Debug, Error)]
pub(crate) enum LoggingError {
    #[error("unsupported log level {0:?}; expected one of trace, debug, info, warn, error, off")]
    Level(String),
    #[error("failed to create log directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to start logger")]
    Start(#[from] flexi_logger::FlexiLoggerError),
}

/// Start logging at `level` into `log_dir`.  Logging stays active until the
/// returned handle is dropped.
pub(crate) fn init_logging(level: &str, log_dir: &Path) -> Result<LoggerHandle, LoggingError> {
    let level = normalize_level(level)?;
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.to_path_buf(),
        source,
    })?;
    let handle = Logger::try_with_str(level)?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;
    install_panic_hook();
    info!(
        "event=app_start module=main status=ok version={} level={level} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );
    Ok(handle)
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        _ => Err(LoggingError::Level(level.to_owned())),
    }
}

fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info.location().map_or_else(
            || String::from("unknown"),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        let payload = panic_payload_summary(panic_info);
        error!("event=panic module=main status=error location={location} payload={payload}");
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        *message
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    };
    sanitize_message(payload, MAX_PANIC_PAYLOAD_CHARS)
}

/// Flatten `value` onto one line and cut it to at most `max_chars`
/// characters so that it can be embedded in a log record
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(matches!(
            normalize_level("loud"),
            Err(LoggingError::Level(s)) if s == "loud"
        ));
    }

    #[test]
    fn test_sanitize_message() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert_eq!(sanitized, "line1 li...");
        assert_eq!(sanitize_message("short", 8), "short");
    }

    #[test]
    fn test_bad_level_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        assert!(matches!(
            init_logging("chatty", &log_dir),
            Err(LoggingError::Level(_))
        ));
        assert!(!log_dir.exists());
    }
}
