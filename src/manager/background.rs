//! Background output collection for managed relays
//!
//! One task per relay drains its event sequence into the line buffer and
//! moves the relay to the completed map once the terminal event arrives.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

use super::session::{ActiveRelay, CompletedRelay, LineBuffer};
use crate::relay::RelayEvents;
use crate::types::events::RelayEvent;
use crate::types::identifiers::RelayId;

/// Shared state for the output collector task
pub(super) struct CollectorContext {
    pub relay_id: RelayId,
    pub command: String,
    pub lines: Arc<Mutex<LineBuffer>>,
    pub line_tx: tokio::sync::broadcast::Sender<String>,
    pub active: Arc<AsyncMutex<HashMap<RelayId, ActiveRelay>>>,
    pub completed: Arc<AsyncMutex<HashMap<RelayId, CompletedRelay>>>,
}

/// Spawn a background task that collects a relay's output
///
/// The task runs until the relay's event sequence ends, then retires the
/// relay from the active map into the completed map.
pub(super) fn spawn_output_collector(mut events: RelayEvents, ctx: CollectorContext) {
    tokio::spawn(async move {
        let short = ctx.relay_id.short().to_string();

        while let Some(event) = events.recv().await {
            match event {
                RelayEvent::Output { line } => {
                    ctx.lines.lock().push(line.clone());
                    // No live followers is fine
                    let _ = ctx.line_tx.send(line);
                }
                RelayEvent::Finished { completion } => {
                    log::info!("[{short}] process finished: {completion}");
                }
                RelayEvent::Failed { kind, message } => {
                    log::error!("[{short}] relay failed ({kind:?}): {message}");
                }
            }
        }

        let Some(active) = ctx.active.lock().await.remove(&ctx.relay_id) else {
            return;
        };

        let completed = CompletedRelay {
            relay_id: ctx.relay_id.clone(),
            label: active.label,
            command: ctx.command,
            lines: ctx.lines.lock().clone(),
            final_state: active.handle.state(),
            runtime_ms: u64::try_from(active.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            started_wall: active.started_wall,
            completed_at: Utc::now(),
        };

        ctx.completed
            .lock()
            .await
            .insert(ctx.relay_id.clone(), completed);
    });
}
