//! Process-wide `tracing` setup for lapse binaries.
//!
//! Configuration comes from `LAPSE_LOG` (filter directives) and
//! `LAPSE_LOG_FORMAT` (`text`, `json` or `journald`).
mod config;
mod error;
mod format;
mod init;

pub use config::{DEFAULT_DIRECTIVES, ENV_LOG, ENV_LOG_FORMAT, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;
pub use init::init_logger;

/// Read the logger configuration from the environment and install it.
pub fn init_from_env() -> Result<LoggerConfig, LoggerError> {
    let cfg = LoggerConfig::from_env()?;
    init_logger(&cfg)?;
    Ok(cfg)
}
