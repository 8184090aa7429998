//! Logging facade for the omega crates.
//!
//! The macros forward to the `log` crate. [`init_logger`] wires `log4rs` with a console
//! appender and, when a log directory is given, rolling file appenders.

mod appender;
mod consts;
mod logger;

pub use consts::*;
pub use logger::LogError;

#[doc(hidden)]
pub use log as __log;

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => ( $crate::log::__log::trace!($($t)*) )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => ( $crate::log::__log::debug!($($t)*) )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => ( $crate::log::__log::info!($($t)*) )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => ( $crate::log::__log::warn!($($t)*) )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => ( $crate::log::__log::error!($($t)*) )
}

use appender::AppenderSpec;
use log::LevelFilter;
use log4rs::config::{Config, Root};
use logger::Builder;

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

/// Initializes the global logger.
///
/// `filters` is a comma separated expression such as `info,omega_platformvm=debug`. A bare level
/// sets the root level, `name=level` pairs set per-module levels.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(dir) = log_dir {
        appenders.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), dir, ERR_LOG_FILE_NAME)?);
    }
    let names: Vec<&'static str> = appenders.iter().map(|a| a.name).collect();

    let loggers = Builder::new().parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters).build();

    let config = Config::builder()
        .appenders(appenders.into_iter().map(|mut a| a.appender()))
        .loggers(loggers.items())
        .build(Root::builder().appenders(names).build(loggers.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))?;

    log4rs::init_config(config).map_err(|err| LogError::Init(err.to_string()))?;
    Ok(())
}

/// Tries to init the global logger, but does not panic if it was already setup.
/// Should be used for tests.
pub fn try_init_logger(filters: &str) {
    let _ = init_logger(None, filters);
}
