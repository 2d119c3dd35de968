//! Relay manager request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::RelayId;
use super::state::RelayState;

/// Request parameters for starting a managed relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRelayRequest {
    /// Label for identifying the relay (e.g. the profile name)
    pub label: String,
    /// Executable name or path
    pub command: String,
    /// Argument tokens
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// Page of buffered output for one relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayOutput {
    /// Relay identifier
    pub relay_id: RelayId,
    /// Relay label
    pub label: String,
    /// State at the time of the query
    pub state: RelayState,
    /// Requested lines
    pub lines: Vec<String>,
    /// Lines currently buffered
    pub total_lines: usize,
    /// Lines evicted from the buffer so far
    pub dropped_lines: usize,
    /// Number of lines in this page
    pub lines_returned: usize,
    /// Whether lines exist past this page
    pub has_more: bool,
    /// Whether the relay has produced its terminal event
    pub is_complete: bool,
}

/// Summary of one relay for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySummary {
    /// Relay identifier
    pub relay_id: RelayId,
    /// Relay label
    pub label: String,
    /// Command as started
    pub command: String,
    /// Current or final state
    pub state: RelayState,
    /// Runtime so far, or total runtime once complete
    pub runtime_ms: u64,
    /// Lines relayed so far, including evicted ones
    pub line_count: usize,
    /// Most recent lines
    pub last_output: Vec<String>,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    /// Wall-clock completion time
    pub completed_at: Option<DateTime<Utc>>,
}

/// Listing of managed relays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRelaysResponse {
    /// Relays, running first, then most recent first
    pub relays: Vec<RelaySummary>,
    /// Number of active relays
    pub total_active: usize,
    /// Number of retained completed relays
    pub total_completed: usize,
}
