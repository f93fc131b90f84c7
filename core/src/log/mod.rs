//! Logger bootstrap for Collider binaries and tests.
//!
//! Library crates only depend on the `log` facade; binaries call [`init_logger`] once at startup.

mod appender;
pub mod consts;
mod logger;

use appender::AppenderSpec;
use consts::{CONSOLE_APPENDER, DEFAULT_LOGGER_ENV, ERR_LOG_FILE_APPENDER, ERR_LOG_FILE_NAME, LOG_FILE_APPENDER, LOG_FILE_NAME};
use log::LevelFilter;
use log4rs::config::{Config, Root};
use logger::Loggers;
use thiserror::Error;

pub use log::{debug, error, info, trace, warn};

#[derive(Clone, Debug, Error)]
pub enum LogError {
    #[error("Logger spec parsing error: {0}")]
    ParseLoggerSpecError(String),

    #[error("Log appender error: {0}")]
    Appender(String),

    #[error("Logger configuration error: {0}")]
    Config(String),

    #[error("A logger is already installed")]
    AlreadyInitialized,
}

fn build_config(log_dir: Option<&str>, filters: &str) -> Result<Config, LogError> {
    let mut loggers = Loggers::new(LevelFilter::Info);
    loggers.parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters);

    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_dir) = log_dir {
        appenders.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME)?);
    }
    let names = appenders.iter().map(|x| x.name).collect::<Vec<_>>();

    Config::builder()
        .appenders(appenders.into_iter().map(AppenderSpec::into_appender))
        .loggers(loggers.items(&names))
        .build(Root::builder().appenders(names.iter().copied()).build(loggers.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))
}

/// Installs the global logger: console output, plus rolling files when `log_dir` is provided.
/// `filters` follows the `RUST_LOG` syntax and is applied after the environment variable.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let config = build_config(log_dir, filters)?;
    log4rs::init_config(config).map(|_| ()).map_err(|_| LogError::AlreadyInitialized)
}

/// Console-only variant of [`init_logger`] which silently keeps an already installed logger.
/// Meant for tests, where many cases race to install the logger.
pub fn try_init_logger(filters: &str) {
    if let Ok(config) = build_config(None, filters) {
        let _ = log4rs::init_config(config);
    }
}
