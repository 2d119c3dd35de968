//! Single relay queries

use crate::error::{RelayError, Result};
use crate::types::identifiers::RelayId;
use crate::types::manager::RelaySummary;

use super::core::RelayManager;
use super::list::{summarize_active, summarize_completed};

/// Lines of recent output included in a single relay summary
const INFO_OUTPUT_LINES: usize = 3;

impl RelayManager {
    /// Get a summary of one relay
    ///
    /// Checks active relays first, then completed ones.
    ///
    /// # Errors
    /// Returns `RelayNotFound` for unknown or expired ids
    pub async fn get_relay_info(&self, relay_id: &RelayId) -> Result<RelaySummary> {
        let active = self.active.lock().await;
        if let Some(relay) = active.get(relay_id) {
            return Ok(summarize_active(relay, INFO_OUTPUT_LINES));
        }
        drop(active);

        let completed = self.completed.lock().await;
        if let Some(relay) = completed.get(relay_id) {
            return Ok(summarize_completed(relay, INFO_OUTPUT_LINES));
        }

        Err(RelayError::relay_not_found(relay_id.as_str()))
    }

    /// Whether a relay is still being observed
    pub async fn is_running(&self, relay_id: &RelayId) -> bool {
        let active = self.active.lock().await;
        active
            .get(relay_id)
            .is_some_and(|relay| !relay.handle.is_terminal())
    }
}
