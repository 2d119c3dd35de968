//! Core type definitions for the process relay
//!
//! - [`identifiers`]: newtype wrappers
//! - [`events`]: events produced by a relay
//! - [`state`]: relay lifecycle state
//! - [`options`]: relay configuration and builder
//! - [`manager`]: relay manager requests and responses

pub mod events;
pub mod identifiers;
pub mod manager;
pub mod options;
pub mod state;

pub use events::{Completion, FAILURE_EXIT_CODE, FailureKind, RelayEvent, RelayFailure};
pub use identifiers::RelayId;
pub use manager::{ListRelaysResponse, RelayOutput, RelaySummary, StartRelayRequest};
pub use options::{ArgumentMode, ChannelKind, RelayOptions, RelayOptionsBuilder};
pub use state::RelayState;
