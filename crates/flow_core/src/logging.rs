//! File logging bootstrap.
//!
//! Logs rotate by size in `FLOW_LOG_DIR` (or `<config dir>/logs`). Messages use
//! `event=<name> key=value` pairs and never include note or task content.

use crate::config::config_dir;
use crate::error::AppError;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "flow";
const LOG_DIR_ENV_VAR: &str = "FLOW_LOG_DIR";
const LOG_LEVEL_ENV_VAR: &str = "FLOW_LOG";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    log_dir: PathBuf,
    _logger: LoggerHandle,
}

/// Level from `FLOW_LOG`, then the configured level, then the build default.
pub fn resolve_level(configured: Option<&str>) -> Result<&'static str, AppError> {
    match std::env::var(LOG_LEVEL_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => normalize_level(&value),
        _ => match configured {
            Some(value) => normalize_level(value),
            None => Ok(default_log_level()),
        },
    }
}

pub fn log_dir() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(LOG_DIR_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(config_dir()?.join("logs"))
}

pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Starts file logging once per process; later calls with the same
/// directory are no-ops.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), AppError> {
    let level = normalize_level(level)?;

    if let Some(state) = LOGGING_STATE.get() {
        if state.log_dir != log_dir {
            return Err(AppError::invalid_input(format!(
                "logging already initialized at {}",
                state.log_dir.display()
            )));
        }
        return Ok(());
    }

    LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, AppError> {
        std::fs::create_dir_all(log_dir).map_err(|err| {
            AppError::io(format!(
                "failed to create log directory {}: {err}",
                log_dir.display()
            ))
        })?;

        let logger = Logger::try_with_str(level)
            .map_err(|err| AppError::invalid_input(format!("invalid log level {level}: {err}")))?
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
            .write_mode(WriteMode::Direct)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| AppError::io(format!("failed to start logger: {err}")))?;

        info!(
            "event=app_start status=ok platform={} version={} level={}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION"),
            level
        );

        Ok(LoggingState {
            log_dir: log_dir.to_path_buf(),
            _logger: logger,
        })
    })?;

    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, AppError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => Err(AppError::invalid_input(format!(
            "unsupported log level '{other}'; expected trace|debug|info|warn|error|off"
        ))),
    }
}
