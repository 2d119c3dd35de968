//! Relay listing functionality

use std::cmp::Ordering;

use crate::error::Result;
use crate::types::manager::{ListRelaysResponse, RelaySummary};

use super::super::session::{ActiveRelay, CompletedRelay};
use super::core::RelayManager;
use super::pagination::last_lines;

pub(super) fn summarize_active(relay: &ActiveRelay, last_output_lines: usize) -> RelaySummary {
    let buffer = relay.lines.lock();
    RelaySummary {
        relay_id: relay.handle.id().clone(),
        label: relay.label.clone(),
        command: relay.handle.command().to_string(),
        state: relay.handle.state(),
        runtime_ms: u64::try_from(relay.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
        line_count: buffer.total_seen(),
        last_output: last_lines(buffer.lines(), last_output_lines),
        started_at: relay.started_wall,
        completed_at: None,
    }
}

pub(super) fn summarize_completed(relay: &CompletedRelay, last_output_lines: usize) -> RelaySummary {
    RelaySummary {
        relay_id: relay.relay_id.clone(),
        label: relay.label.clone(),
        command: relay.command.clone(),
        state: relay.final_state.clone(),
        runtime_ms: relay.runtime_ms,
        line_count: relay.lines.total_seen(),
        last_output: last_lines(relay.lines.lines(), last_output_lines),
        started_at: relay.started_wall,
        completed_at: Some(relay.completed_at),
    }
}

impl RelayManager {
    /// List managed relays
    ///
    /// Running relays come first, then the rest ordered by runtime (longest
    /// first).
    ///
    /// # Errors
    /// Currently infallible
    pub async fn list(
        &self,
        include_completed: bool,
        last_output_lines: usize,
    ) -> Result<ListRelaysResponse> {
        let mut relays: Vec<RelaySummary> = {
            let active = self.active.lock().await;
            active
                .values()
                .map(|relay| summarize_active(relay, last_output_lines))
                .collect()
        };
        let total_active = relays.len();

        let mut total_completed = 0;
        if include_completed {
            let completed = self.completed.lock().await;
            total_completed = completed.len();
            relays.extend(
                completed
                    .values()
                    .map(|relay| summarize_completed(relay, last_output_lines)),
            );
        }

        relays.sort_by(|a, b| {
            let a_running = !a.state.is_terminal();
            let b_running = !b.state.is_terminal();
            match (a_running, b_running) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => b.runtime_ms.cmp(&a.runtime_ms),
            }
        });

        Ok(ListRelaysResponse {
            relays,
            total_active,
            total_completed,
        })
    }

    /// Labels of relays whose process is still being observed
    ///
    /// Sorted and deduplicated, for "these are still running" prompts.
    pub async fn running_labels(&self) -> Vec<String> {
        let active = self.active.lock().await;
        let mut labels: Vec<String> = active
            .values()
            .filter(|relay| !relay.handle.is_terminal())
            .map(|relay| relay.label.clone())
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }
}
