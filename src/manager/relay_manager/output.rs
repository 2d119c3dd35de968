//! Relay output retrieval with pagination

use crate::error::{RelayError, Result};
use crate::types::identifiers::RelayId;
use crate::types::manager::RelayOutput;

use super::core::RelayManager;
use super::pagination::{calculate_has_more, paginate_lines};

impl RelayManager {
    /// Get paginated output from a relay
    ///
    /// Supports offset/length pagination:
    /// - offset >= 0: start from line N, take `length` lines
    /// - offset < 0: tail mode, take the last |offset| lines
    ///
    /// Offsets index the lines currently buffered; evicted lines are only
    /// counted in `dropped_lines`.
    ///
    /// # Errors
    /// Returns `RelayNotFound` for unknown or expired ids
    pub async fn get_output(
        &self,
        relay_id: &RelayId,
        offset: i64,
        length: usize,
    ) -> Result<RelayOutput> {
        let active = self.active.lock().await;
        if let Some(relay) = active.get(relay_id) {
            let state = relay.handle.state();
            let buffer = relay.lines.lock();
            let lines = paginate_lines(buffer.lines(), offset, length);
            let total_lines = buffer.lines().len();
            let lines_returned = lines.len();

            return Ok(RelayOutput {
                relay_id: relay_id.clone(),
                label: relay.label.clone(),
                is_complete: state.is_terminal(),
                state,
                lines,
                total_lines,
                dropped_lines: buffer.dropped(),
                lines_returned,
                has_more: calculate_has_more(offset, lines_returned, total_lines),
            });
        }
        drop(active);

        let completed = self.completed.lock().await;
        if let Some(relay) = completed.get(relay_id) {
            let lines = paginate_lines(relay.lines.lines(), offset, length);
            let total_lines = relay.lines.lines().len();
            let lines_returned = lines.len();

            return Ok(RelayOutput {
                relay_id: relay_id.clone(),
                label: relay.label.clone(),
                state: relay.final_state.clone(),
                lines,
                total_lines,
                dropped_lines: relay.lines.dropped(),
                lines_returned,
                has_more: calculate_has_more(offset, lines_returned, total_lines),
                is_complete: true,
            });
        }

        Err(RelayError::relay_not_found(relay_id.as_str()))
    }
}
