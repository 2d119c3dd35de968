//! Relay start logic
//!
//! Starts a relay and the background task collecting its output.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

use crate::error::{RelayError, Result};
use crate::types::identifiers::RelayId;
use crate::types::manager::StartRelayRequest;

use super::super::background::{CollectorContext, spawn_output_collector};
use super::super::session::{ActiveRelay, LineBuffer};
use super::core::{OUTPUT_BUFFER_CAPACITY, RelayManager};

/// Capacity of the live output broadcast channel
const LINE_BROADCAST_CAPACITY: usize = 256;

impl RelayManager {
    /// Start a managed relay
    ///
    /// Launches the command through the manager's [`ProcessRelay`](crate::ProcessRelay)
    /// and spawns a background task that buffers its output. Launch failures
    /// surface as a `Failed` final state on the returned relay, not as an
    /// error here.
    ///
    /// # Errors
    /// Returns an error if the relay itself could not be set up (pipe
    /// allocation, invalid options, worker thread creation)
    pub async fn start_relay(&self, request: StartRelayRequest) -> Result<RelayId> {
        let StartRelayRequest {
            label,
            command,
            arguments,
        } = request;

        let mut handle = self.relay.start(command.clone(), arguments)?;
        let relay_id = handle.id().clone();
        let events = handle
            .take_events()
            .ok_or_else(|| RelayError::spawn("relay events already taken"))?;

        let lines = Arc::new(Mutex::new(LineBuffer::new(OUTPUT_BUFFER_CAPACITY)));
        let (line_tx, _) = broadcast::channel(LINE_BROADCAST_CAPACITY);

        let active = ActiveRelay {
            label: label.clone(),
            handle: Arc::new(handle),
            lines: Arc::clone(&lines),
            line_tx: line_tx.clone(),
            started_at: Instant::now(),
            started_wall: Utc::now(),
        };

        // Insert before the collector can retire it
        self.active.lock().await.insert(relay_id.clone(), active);

        spawn_output_collector(
            events,
            CollectorContext {
                relay_id: relay_id.clone(),
                command,
                lines,
                line_tx,
                active: Arc::clone(&self.active),
                completed: Arc::clone(&self.completed),
            },
        );

        log::info!("[{}] started managed relay '{label}'", relay_id.short());
        Ok(relay_id)
    }
}
