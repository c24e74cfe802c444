use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggerError {
    #[error("unknown log format `{0}` (expected text, json or journald)")]
    UnknownFormat(String),
    #[error("journald output needs Linux and the `journald` feature")]
    JournaldUnavailable,
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("invalid filter directives `{0}`")]
    InvalidDirectives(String),
    #[error("logger setup failed: {0}")]
    InitializationFailed(String),
}
