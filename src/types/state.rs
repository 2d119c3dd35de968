//! Relay lifecycle state

use serde::{Deserialize, Serialize};

use super::events::{Completion, RelayFailure};

/// Lifecycle state of a relay
///
/// `Idle -> Running -> (StopRequested) -> Finished | Failed`. Terminal states
/// never change again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RelayState {
    /// Created, process not launched yet
    #[default]
    Idle,
    /// Process launched and the channel is being read
    Running,
    /// Cancellation requested, terminal event pending
    StopRequested,
    /// Relay finished observing the process
    Finished {
        /// How the process ended
        completion: Completion,
    },
    /// Relay failed
    Failed {
        /// Failure details
        failure: RelayFailure,
    },
}

impl RelayState {
    /// Whether the state is `Finished` or `Failed`
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. })
    }

    /// Short lowercase label, used in summaries and logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::StopRequested => "stop_requested",
            Self::Finished { .. } => "finished",
            Self::Failed { .. } => "failed",
        }
    }
}
