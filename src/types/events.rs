//! Relay event types
//!
//! A relay produces any number of [`RelayEvent::Output`] lines followed by
//! exactly one terminal event, [`RelayEvent::Finished`] or
//! [`RelayEvent::Failed`].

use serde::{Deserialize, Serialize};

/// Exit indicator reported for failed relays
pub const FAILURE_EXIT_CODE: i32 = 1;

/// How a relayed process ended, as far as the relay observed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Completion {
    /// Process exited with the given code
    Exited(i32),
    /// Process was killed by the given signal
    Signaled(i32),
    /// Observation was stopped before the process ended (or before it launched)
    Detached,
}

impl Completion {
    /// Exit code, when the process exited normally
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            _ => None,
        }
    }

    /// Whether the process exited with code 0
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    pub(crate) fn from_status(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signaled(signal);
            }
        }

        Self::Exited(FAILURE_EXIT_CODE)
    }
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited ({code})"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
            Self::Detached => f.write_str("detached"),
        }
    }
}

/// Which stage of the relay failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Channel creation, command resolution or process launch
    Spawn,
    /// Reading the channel
    Read,
}

/// Terminal failure of a relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFailure {
    /// Failure stage
    pub kind: FailureKind,
    /// Human readable error text
    pub message: String,
}

/// Event produced by a relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// One line of combined stdout/stderr, without its line terminator
    Output {
        /// Line text
        line: String,
    },
    /// The relay finished observing the process
    Finished {
        /// How the process ended
        completion: Completion,
    },
    /// The relay failed
    Failed {
        /// Failure stage
        kind: FailureKind,
        /// Error text
        message: String,
    },
}

impl RelayEvent {
    /// Whether this is the terminal event of its relay
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Output { .. })
    }

    /// Output line, if this is an output event
    #[must_use]
    pub fn line(&self) -> Option<&str> {
        match self {
            Self::Output { line } => Some(line),
            _ => None,
        }
    }

    /// Exit indicator carried by a terminal event
    ///
    /// `Finished` reports the process exit code when known, `Failed` always
    /// reports [`FAILURE_EXIT_CODE`].
    #[must_use]
    pub const fn exit_indicator(&self) -> Option<i32> {
        match self {
            Self::Output { .. } => None,
            Self::Finished { completion } => completion.code(),
            Self::Failed { .. } => Some(FAILURE_EXIT_CODE),
        }
    }
}

impl From<RelayFailure> for RelayEvent {
    fn from(failure: RelayFailure) -> Self {
        Self::Failed {
            kind: failure.kind,
            message: failure.message,
        }
    }
}
