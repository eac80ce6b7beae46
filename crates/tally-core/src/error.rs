//! Shared error type across tally crates.

use std::io;

use thiserror::Error;

/// Stable error categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid metric set or configuration.
    Config,
    /// Log file or worker thread failed.
    Io,
}

impl ErrorKind {
    /// String representation used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Io => "IO",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TallyError>;

/// Unified error type used by core and logger.
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("duplicate metric kind: {0}")]
    DuplicateKind(&'static str),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error("batch writer panicked")]
    WorkerPanicked,
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl TallyError {
    /// Wrap an I/O error with a short description of what failed.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        TallyError::Io {
            context: context.into(),
            source,
        }
    }

    /// Map the error to its stable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TallyError::DuplicateKind(_)
            | TallyError::Config(_)
            | TallyError::UnsupportedVersion(_) => ErrorKind::Config,
            TallyError::Io { .. } | TallyError::WorkerPanicked => ErrorKind::Io,
        }
    }
}
