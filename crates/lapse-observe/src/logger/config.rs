use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat};

/// `EnvFilter` directives, e.g. `lapse_core=debug,info`.
pub const ENV_LOG: &str = "LAPSE_LOG";
/// Output format name, parsed with [`LoggerFormat::from_str`](std::str::FromStr).
pub const ENV_LOG_FORMAT: &str = "LAPSE_LOG_FORMAT";
/// Dependencies stay at `warn`; every `lapse*` target (crates and `lapse.*`
/// dotted targets alike) logs at `info`.
pub const DEFAULT_DIRECTIVES: &str = "warn,lapse=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub directives: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            directives: DEFAULT_DIRECTIVES.to_string(),
            with_targets: true,
            use_color: std::io::stdout().is_terminal(),
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by `LAPSE_LOG` and `LAPSE_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut cfg = Self::default();
        if let Some(format) = read(ENV_LOG_FORMAT) {
            cfg = cfg.with_format(format.parse()?);
        }
        if let Some(directives) = read(ENV_LOG) {
            cfg.directives = directives;
        }
        Ok(cfg)
    }

    /// Switching away from text also turns colors off.
    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self.use_color &= format.supports_color();
        self
    }

    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = directives.into();
        self
    }
}
