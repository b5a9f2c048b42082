//! Error types for bufferlog
//!
//! Configuration mistakes, unparseable severities and environment failures are kept
//! apart so callers can decide which of them are fatal for their application.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building sinks or writing log output
#[derive(Debug, Error)]
pub enum LogError {
    /// A sink or formatter was configured with a value it cannot work with
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Severity text or rank that does not name a known level
    #[error("unknown severity `{0}`")]
    UnknownSeverity(String),

    /// File system failure on a log or control file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure writing to a console stream
    #[error("failed to write to {stream}: {source}")]
    Stream {
        stream: &'static str,
        #[source]
        source: io::Error,
    },
}

impl LogError {
    /// Wrap an I/O error together with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LogError::Io {
            path: path.into(),
            source,
        }
    }

    /// Check whether this error is a configuration problem rather than an environment one
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LogError::InvalidArgument(_) | LogError::UnknownSeverity(_)
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LogError>;
