//! Error types for the process relay

use thiserror::Error;

use crate::types::events::FailureKind;

/// Main error type for the process relay
#[derive(Error, Debug)]
pub enum RelayError {
    /// No unique pipe path could be allocated
    #[error("Could not allocate a unique pipe path after {attempts} attempts in {dir}")]
    PipeAllocation {
        /// Number of names tried
        attempts: usize,
        /// Directory the names were tried in
        dir: String,
    },

    /// Command could not be resolved to an executable
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// Channel creation or process launch failed
    #[error("Spawn error: {0}")]
    Spawn(String),

    /// Reading the channel failed
    #[error("Read error: {0}")]
    Read(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Signal delivery failed
    #[error("Signal error: {0}")]
    Signal(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Relay id not known to the manager
    #[error("Relay not found: {0}")]
    RelayNotFound(String),

    /// Relay has already produced its terminal event
    #[error("Relay {0} is already complete")]
    RelayComplete(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Create a spawn error
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Create a read error
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Create a command not found error
    pub fn command_not_found(msg: impl Into<String>) -> Self {
        Self::CommandNotFound(msg.into())
    }

    /// Create a signal error
    pub fn signal(msg: impl Into<String>) -> Self {
        Self::Signal(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a relay not found error
    pub fn relay_not_found(id: impl Into<String>) -> Self {
        Self::RelayNotFound(id.into())
    }

    /// Which terminal failure this error represents when it ends a relay
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Read(_) => FailureKind::Read,
            _ => FailureKind::Spawn,
        }
    }
}
