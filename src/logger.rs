//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, after config is resolved. Hook invocations
//! log inside a `hook_invocation` span, so enabling `debug` for this crate
//! shows each dispatch from submission to resolution.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::LoggingConfig;
use crate::error::AppError;

/// Initialise the global tracing subscriber from `config`.
///
/// If `prefer_level` is `true`, `config.level` takes precedence and
/// `RUST_LOG` is only used as a fallback when the level is invalid. If
/// `false`, `RUST_LOG` takes precedence and `config.level` is the fallback.
pub fn init(config: &LoggingConfig, prefer_level: bool) -> Result<(), AppError> {
    let level = config.level.as_str();
    let filter = if prefer_level {
        match EnvFilter::try_new(level) {
            Ok(filter) => filter,
            Err(level_err) => EnvFilter::try_from_default_env().map_err(|env_err| {
                AppError::Logger(format!(
                    "invalid log level '{level}': {level_err}; RUST_LOG parse failed: {env_err}"
                ))
            })?,
        }
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?
    };

    let writer = match config.file.as_deref() {
        Some(path) => file_writer(path)?,
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(())
}

fn file_writer(path: &Path) -> Result<BoxMakeWriter, AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            AppError::Logger(format!("failed to open log file '{}': {e}", path.display()))
        })?;
    Ok(BoxMakeWriter::new(file))
}

/// Parse a log level string into a [`LevelFilter`], returning an error on
/// unrecognised values.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
