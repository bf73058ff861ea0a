//! Log setup for applications built on the library.
//!
//! The library itself only emits `tracing` records; nothing is printed until a
//! subscriber is installed, either here or by the application.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::MelisaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// `tracing` has no level above ERROR, so Critical shares it.
    pub fn as_tracing(self) -> Level {
        match self {
            Self::Critical | Self::Error => Level::ERROR,
            Self::Warning => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "CRITICAL",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = MelisaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(MelisaError::InvalidArgument(format!(
                "unknown log level `{other}`"
            ))),
        }
    }
}

/// Install a global fmt subscriber. `RUST_LOG` wins over `level`.
///
/// Does nothing for `None`, or when a global subscriber already exists.
pub fn init_logging(level: Option<LogLevel>) {
    let Some(level) = level else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_tracing().as_str().to_ascii_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_maps_to_error() {
        assert_eq!(LogLevel::Critical.as_tracing(), Level::ERROR);
        assert_eq!(LogLevel::Warning.as_tracing(), Level::WARN);
    }

    #[test]
    fn parses_names() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(Some(LogLevel::Debug));
        init_logging(Some(LogLevel::Info));
        init_logging(None);
    }
}
