//! Logging facade for the workspace crates.
//!
//! Crates log through the `trace!`..`error!` macros exported here, which forward to the [`log`] crate. The process
//! wiring the stores and guarantors together calls [`init_logger`] once to install a log4rs backend.

pub use log::{Level, LevelFilter};

use appender::AppenderSpec;
use log4rs::config::{Config, Root};
use logger::Builder;

pub use logger::LogError;

mod appender;
mod logger;

const DEFAULT_LOGGER_ENV: &str = "RUST_LOG";

pub const LOG_FILE_NAME: &str = "sopnet.log";
pub const ERR_LOG_FILE_NAME: &str = "sopnet_err.log";

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => {
        log::trace!($($t)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {
        log::debug!($($t)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {
        log::info!($($t)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {
        log::warn!($($t)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {
        log::error!($($t)*)
    };
}

/// Installs the global logger.
///
/// `filters` is a comma-separated list of `level`, `target` or `target=level` directives applied on top of the
/// `RUST_LOG` environment variable. When `log_dir` is set, all records also go to a rolling log file and records
/// of level warn and above go to a separate error log file.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_dir) = log_dir {
        appenders.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME)?);
    }
    let names = appenders.iter().map(|x| x.name).collect::<Vec<_>>();

    let loggers = Builder::new()
        .root_level(LevelFilter::Info)
        .appenders(names.iter().copied())
        .parse_env(DEFAULT_LOGGER_ENV)
        .parse_expression(filters)
        .build();

    let config = Config::builder()
        .appenders(appenders.iter_mut().filter_map(|x| x.appender()))
        .loggers(loggers.items())
        .build(Root::builder().appenders(names.iter().map(|x| x.to_string())).build(loggers.root_level()))
        .map_err(|err| LogError::ConfigError(err.to_string()))?;

    log4rs::init_config(config).map_err(|_| LogError::AlreadyInitialized)?;
    Ok(())
}

/// Installs a console logger unless some logger is installed already. Tests sharing a process call this freely.
pub fn try_init_logger(filters: &str) {
    if let Err(LogError::ConfigError(err)) = init_logger(None, filters) {
        eprintln!("invalid logger configuration: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_once() {
        let dir = std::env::temp_dir().join(format!("sopnet-log-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        init_logger(dir.to_str(), "info,sopnet_blockwise=debug").unwrap();
        crate::warn!("logger installed");
        assert!(matches!(init_logger(None, "info"), Err(LogError::AlreadyInitialized)));
        try_init_logger("debug");
        assert!(dir.join(LOG_FILE_NAME).exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
