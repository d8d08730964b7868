//! Process-wide logging setup.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend from `LogSettings` once per process.
//! - Capture panics as sanitized log records.
//!
//! # Invariants
//! - Re-initializing with identical settings is a no-op.
//! - Re-initializing with different settings is rejected, never applied.
//! - Initialization never panics.

use crate::config::LogSettings;
use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "learnpath";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<ActiveLogging> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Normalized logging targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingTargets {
    pub level: &'static str,
    pub log_dir: Option<PathBuf>,
    pub stderr: bool,
}

struct ActiveLogging {
    targets: LoggingTargets,
    _logger: Option<LoggerHandle>,
}

/// Starts logging as described by `settings`.
///
/// With neither a directory nor stderr configured, logging stays off and the
/// call still succeeds.
///
/// # Errors
/// - Unsupported level, relative or blank directory.
/// - Log directory cannot be created or the backend fails to start.
/// - Logging is already active with different targets.
pub fn init_logging(settings: &LogSettings) -> Result<(), String> {
    let targets = normalize_targets(settings)?;

    if let Some(active) = LOGGING_STATE.get() {
        return check_same(&active.targets, &targets);
    }

    let init_targets = targets.clone();
    let active = LOGGING_STATE.get_or_try_init(|| -> Result<ActiveLogging, String> {
        let logger = start_backend(&init_targets)?;
        if logger.is_some() {
            install_panic_hook_once();
            info!(
                "event=logging_init module=core status=ok level={} log_dir={} stderr={} version={}",
                init_targets.level,
                init_targets
                    .log_dir
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |dir| dir.display().to_string()),
                init_targets.stderr,
                env!("CARGO_PKG_VERSION")
            );
        }
        Ok(ActiveLogging {
            targets: init_targets,
            _logger: logger,
        })
    })?;

    check_same(&active.targets, &targets)
}

/// Returns the active targets, or `None` before `init_logging` succeeded.
pub fn logging_status() -> Option<LoggingTargets> {
    LOGGING_STATE.get().map(|active| active.targets.clone())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_backend(targets: &LoggingTargets) -> Result<Option<LoggerHandle>, String> {
    let logger = Logger::try_with_str(targets.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", targets.level))?;

    let logger = match (&targets.log_dir, targets.stderr) {
        (None, false) => return Ok(None),
        (None, true) => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::default_format),
        (Some(dir), stderr) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            let duplicate = if stderr { Duplicate::All } else { Duplicate::None };
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
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
                .duplicate_to_stderr(duplicate)
                .format_for_stderr(flexi_logger::default_format)
        }
    };

    logger
        .start()
        .map(Some)
        .map_err(|err| format!("failed to start logger: {err}"))
}

fn check_same(active: &LoggingTargets, requested: &LoggingTargets) -> Result<(), String> {
    if active == requested {
        return Ok(());
    }
    Err(format!(
        "logging already initialized with {}; refusing to switch to {}",
        describe(active),
        describe(requested)
    ))
}

fn describe(targets: &LoggingTargets) -> String {
    format!(
        "level `{}`, dir `{}`, stderr {}",
        targets.level,
        targets
            .log_dir
            .as_ref()
            .map_or_else(|| "-".to_string(), |dir| dir.display().to_string()),
        targets.stderr
    )
}

fn normalize_targets(settings: &LogSettings) -> Result<LoggingTargets, String> {
    let log_dir = match &settings.dir {
        Some(dir) if dir.as_os_str().is_empty() => {
            return Err("log dir cannot be empty".to_string())
        }
        Some(dir) if !dir.is_absolute() => {
            return Err(format!(
                "log dir must be an absolute path, got `{}`",
                dir.display()
            ))
        }
        Some(dir) => Some(dir.clone()),
        None => None,
    };
    Ok(LoggingTargets {
        level: normalize_level(&settings.level)?,
        log_dir,
        stderr: settings.stderr,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = if let Some(message) = panic_info.payload().downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = panic_info.payload().downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous_hook(panic_info);
    }));
}

// Payloads may quote document text; keep them on one short line.
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    let mut out: String = flattened.chars().take(max_chars).collect();
    if flattened.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
