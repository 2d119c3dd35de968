//! Relay bookkeeping structures
//!
//! Defines the data kept for active and completed managed relays.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

use crate::relay::RelayHandle;
use crate::types::identifiers::RelayId;
use crate::types::state::RelayState;

/// Bounded FIFO of output lines
#[derive(Debug, Clone)]
pub(super) struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    dropped: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Append a line, evicting the oldest one when full
    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    pub const fn lines(&self) -> &VecDeque<String> {
        &self.lines
    }

    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Lines ever pushed, including evicted ones
    pub fn total_seen(&self) -> usize {
        self.lines.len() + self.dropped
    }
}

/// Active relay data (stored until the terminal event is collected)
pub(super) struct ActiveRelay {
    /// Human-readable label for the relay
    pub label: String,

    /// Handle used for stop and terminate
    pub handle: Arc<RelayHandle>,

    /// Output buffer filled by the collector task
    pub lines: Arc<Mutex<LineBuffer>>,

    /// Broadcast channel for live output
    pub line_tx: broadcast::Sender<String>,

    /// When the relay was started
    pub started_at: Instant,

    /// Wall-clock start time
    pub started_wall: DateTime<Utc>,
}

/// Completed relay data (retained for final reads before cleanup)
pub(super) struct CompletedRelay {
    /// Relay identifier
    pub relay_id: RelayId,

    /// Human-readable label for the relay
    pub label: String,

    /// Command as started
    pub command: String,

    /// Final output buffer snapshot
    pub lines: LineBuffer,

    /// Terminal state
    pub final_state: RelayState,

    /// Total runtime in milliseconds
    pub runtime_ms: u64,

    /// Wall-clock start time
    pub started_wall: DateTime<Utc>,

    /// When the relay completed (wall-clock time)
    pub completed_at: DateTime<Utc>,
}
