//! Relay interaction methods
//!
//! Handles stopping, terminating and following relays.

use futures::stream::BoxStream;
use tokio::sync::broadcast;

use crate::error::{RelayError, Result};
use crate::types::identifiers::RelayId;
use crate::types::state::RelayState;

use super::core::RelayManager;

impl RelayManager {
    /// Stop observing a relay
    ///
    /// The process keeps running; the relay finishes with a detached
    /// completion. Stopping a completed relay returns its final state.
    ///
    /// # Errors
    /// Returns `RelayNotFound` for unknown or expired ids
    pub async fn stop_relay(&self, relay_id: &RelayId) -> Result<RelayState> {
        let active = self.active.lock().await;
        if let Some(relay) = active.get(relay_id) {
            relay.handle.stop();
            return Ok(relay.handle.state());
        }
        drop(active);

        self.completed_state(relay_id).await
    }

    /// Kill a relay's process and keep observing it until it exits
    ///
    /// # Errors
    /// Returns `RelayNotFound` for unknown or expired ids, or a signal error
    /// if the kill request fails
    pub async fn terminate_relay(&self, relay_id: &RelayId) -> Result<RelayState> {
        let active = self.active.lock().await;
        if let Some(relay) = active.get(relay_id) {
            relay.handle.terminate()?;
            return Ok(relay.handle.state());
        }
        drop(active);

        self.completed_state(relay_id).await
    }

    /// Wait until a relay reaches a terminal state
    ///
    /// # Errors
    /// Returns `RelayNotFound` for unknown or expired ids
    pub async fn wait_relay(&self, relay_id: &RelayId) -> Result<RelayState> {
        let handle = {
            let active = self.active.lock().await;
            active.get(relay_id).map(|relay| relay.handle.clone())
        };

        match handle {
            Some(handle) => Ok(handle.wait().await),
            None => self.completed_state(relay_id).await,
        }
    }

    /// Follow live output of an active relay
    ///
    /// Yields lines relayed after the call; the stream ends once the
    /// relay's output is exhausted. Lines a slow follower misses are
    /// skipped, not buffered.
    ///
    /// # Errors
    /// Returns `RelayComplete` if the relay already finished, and
    /// `RelayNotFound` for unknown ids
    pub async fn follow(&self, relay_id: &RelayId) -> Result<BoxStream<'static, String>> {
        let rx = {
            let active = self.active.lock().await;
            active.get(relay_id).map(|relay| relay.line_tx.subscribe())
        };
        let Some(mut rx) = rx else {
            if self.completed.lock().await.contains_key(relay_id) {
                return Err(RelayError::RelayComplete(relay_id.to_string()));
            }
            return Err(RelayError::relay_not_found(relay_id.as_str()));
        };

        let short = relay_id.short().to_string();
        Ok(Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(line) => yield line,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("[{short}] follower lagged, skipped {skipped} line(s)");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }

    async fn completed_state(&self, relay_id: &RelayId) -> Result<RelayState> {
        let completed = self.completed.lock().await;
        completed
            .get(relay_id)
            .map(|relay| relay.final_state.clone())
            .ok_or_else(|| RelayError::relay_not_found(relay_id.as_str()))
    }
}
