//! Caller-owned handle to one relay

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::identifiers::RelayId;
use crate::types::options::ChannelKind;
use crate::types::state::RelayState;

use super::events::RelayEvents;
use super::worker::RelayShared;

/// Handle to an in-flight or completed relay
///
/// The handle never touches the channel itself; it can only ask the worker
/// to stop observing ([`stop`](Self::stop)) or kill the process
/// ([`terminate`](Self::terminate)). Dropping the handle does neither.
pub struct RelayHandle {
    pub(super) id: RelayId,
    pub(super) command: String,
    pub(super) arguments: Vec<String>,
    pub(super) channel: ChannelKind,
    pub(super) pipe_path: Option<PathBuf>,
    pub(super) events: Option<RelayEvents>,
    pub(super) state: watch::Receiver<RelayState>,
    pub(super) shared: Arc<RelayShared>,
}

impl RelayHandle {
    /// Relay identifier
    #[must_use]
    pub const fn id(&self) -> &RelayId {
        &self.id
    }

    /// Command as given to `start`
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Argument tokens as given to `start`
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Channel backend in use
    #[must_use]
    pub const fn channel(&self) -> ChannelKind {
        self.channel
    }

    /// FIFO path, for the named pipe backend
    #[must_use]
    pub fn pipe_path(&self) -> Option<&Path> {
        self.pipe_path.as_deref()
    }

    /// Take the event sequence; `None` if it was already taken
    pub fn take_events(&mut self) -> Option<RelayEvents> {
        self.events.take()
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> RelayState {
        self.state.borrow().clone()
    }

    /// Whether the process is launched and still observed
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.state.borrow(), RelayState::Running)
    }

    /// Whether the terminal event has been produced
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.borrow().is_terminal()
    }

    /// Token cancelled when a stop is requested
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Stop observing the process
    ///
    /// Cancels the read loop and unblocks a pending read by writing a wake
    /// payload into the channel. The process keeps running. Calling this on
    /// a terminal relay does nothing.
    pub fn stop(&self) {
        if self.is_terminal() {
            log::debug!("[{}] stop ignored: relay already complete", self.id.short());
            return;
        }

        self.shared.cancel.cancel();
        self.shared.state.send_if_modified(|state| {
            if matches!(state, RelayState::Idle | RelayState::Running) {
                *state = RelayState::StopRequested;
                true
            } else {
                false
            }
        });

        let waker = self.shared.waker.lock().clone();
        if let Some(waker) = waker {
            waker.wake();
        }
        log::debug!("[{}] stop requested", self.id.short());
    }

    /// Kill the process (group) while continuing to observe it
    ///
    /// The terminal event then reports the real completion. Before the
    /// process is launched this falls back to [`stop`](Self::stop), so the
    /// launch never happens.
    ///
    /// # Errors
    /// Returns a signal error if the kill request itself fails
    pub fn terminate(&self) -> Result<()> {
        if self.is_terminal() {
            return Ok(());
        }

        let terminator = self.shared.terminator.lock().clone();
        match terminator {
            Some(terminator) => {
                log::debug!("[{}] terminating process", self.id.short());
                terminator.terminate()
            }
            None => {
                self.stop();
                Ok(())
            }
        }
    }

    /// Wait until the relay is terminal and return the final state
    pub async fn wait(&self) -> RelayState {
        let mut rx = self.state.clone();
        let state = match rx.wait_for(RelayState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }
}

impl std::fmt::Debug for RelayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHandle")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("arguments", &self.arguments)
            .field("channel", &self.channel)
            .field("pipe_path", &self.pipe_path)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
