//! Core relay manager structure and lifecycle management
//!
//! Provides the main `RelayManager` struct with initialization, cleanup, and shutdown.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::relay::ProcessRelay;
use crate::types::identifiers::RelayId;
use crate::types::options::RelayOptions;

use super::super::session::{ActiveRelay, CompletedRelay};

/// Lines buffered per relay before the oldest are evicted
pub(crate) const OUTPUT_BUFFER_CAPACITY: usize = 10_000;

/// Retention time for completed relays before cleanup (1 minute)
const COMPLETED_RETENTION_MS: i64 = 60_000;

/// Interval for cleanup task execution (1 minute)
const CLEANUP_INTERVAL_SECS: u64 = 60;

/// Manager for multiple concurrent relays
///
/// Each relay started through the manager gets a collector task that
/// buffers its output, so callers can page through it, follow it live, or
/// list what is still running. Completed relays are kept for a minute.
pub struct RelayManager {
    pub(super) relay: ProcessRelay,
    pub(super) active: Arc<Mutex<HashMap<RelayId, ActiveRelay>>>,
    pub(super) completed: Arc<Mutex<HashMap<RelayId, CompletedRelay>>>,
    cleanup_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RelayManager {
    /// Create a new `RelayManager` with background cleanup task
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(options: RelayOptions) -> Self {
        let active = Arc::new(Mutex::new(HashMap::new()));
        let completed: Arc<Mutex<HashMap<RelayId, CompletedRelay>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let completed_clone = Arc::clone(&completed);
        let cleanup_handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(CLEANUP_INTERVAL_SECS)).await;

                let mut relays = completed_clone.lock().await;
                let now = Utc::now();
                let before = relays.len();

                relays.retain(|_id, relay| {
                    now.signed_duration_since(relay.completed_at)
                        .num_milliseconds()
                        < COMPLETED_RETENTION_MS
                });

                let removed = before - relays.len();
                if removed > 0 {
                    log::debug!("Dropped {removed} expired relay(s)");
                }
            }
        });

        Self {
            relay: ProcessRelay::with_options(options),
            active,
            completed,
            cleanup_handle: Some(cleanup_handle),
        }
    }

    /// Options used for every relay started by this manager
    #[must_use]
    pub const fn options(&self) -> &RelayOptions {
        self.relay.options()
    }
}

impl Drop for RelayManager {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }
}

impl RelayManager {
    /// Stop observing every active relay
    ///
    /// The processes themselves keep running. Each relay still produces its
    /// terminal event and moves to the completed set.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for parity with the other
    /// lifecycle calls
    pub async fn shutdown(&self) -> Result<()> {
        log::info!("Shutting down RelayManager...");

        let relay_ids: Vec<RelayId> = {
            let active = self.active.lock().await;
            active.keys().cloned().collect()
        };

        for relay_id in relay_ids {
            log::debug!("Stopping relay: {relay_id}");
            if let Err(e) = self.stop_relay(&relay_id).await {
                log::warn!("Failed to stop relay {relay_id}: {e}");
            }
        }

        log::info!("RelayManager shutdown complete");
        Ok(())
    }
}
