//! CLI-specific error types and exit code mapping

use sockwatch_core::error::SockwatchError;
use sockwatch_tracefs::{EventerError, TraceFsError};

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, signal handler, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from sockwatch-core.
    #[error("{0}")]
    Core(#[from] SockwatchError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                   |
    /// |------|-------------------------------------------|
    /// | 0    | Success                                   |
    /// | 1    | General / command error                   |
    /// | 2    | Configuration error                       |
    /// | 3    | Kernel tracing unavailable or failed      |
    /// | 10   | IO error                                  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(SockwatchError::Config(_)) => 2,
            Self::Core(SockwatchError::Trace(_)) => 3,
            Self::Io(_) | Self::Core(SockwatchError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(SockwatchError::Closed) => 1,
        }
    }
}

impl From<TraceFsError> for CliError {
    fn from(e: TraceFsError) -> Self {
        Self::Core(e.into())
    }
}

impl From<EventerError> for CliError {
    fn from(e: EventerError) -> Self {
        Self::Core(e.into())
    }
}
