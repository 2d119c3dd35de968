//! Detached process output relay
//!
//! [`ProcessRelay::start`] launches a command without blocking, and the
//! returned [`RelayHandle`] exposes its combined output as [`RelayEvents`].
//!
//! # Architecture
//!
//! ```text
//!  caller                worker thread               waiter thread
//!  ──────                ─────────────               ─────────────
//!  start() ──spawn──→    resolve command
//!                        create FIFO
//!                        spawn sh -c '…' ──────────→ wait(); publish exit
//!                        open FIFO (blocks)
//!  events ←─line──────   read line, check cancel
//!  stop() ──wake write─→ (unblocked) break
//!  events ←─terminal──   remove FIFO, report
//! ```
//!
//! The waiter is never joined; the child outlives the relay's interest.

mod events;
mod handle;
mod worker;

use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;

use crate::channel::path::allocate_pipe_path;
use crate::error::{RelayError, Result};
use crate::types::identifiers::RelayId;
use crate::types::options::{ChannelKind, RelayOptions};

pub use events::{RelayEvents, RelayTranscript};
pub use handle::RelayHandle;

use worker::{RelayShared, Worker};

/// Starts relays with a fixed set of options
#[derive(Debug, Clone, Default)]
pub struct ProcessRelay {
    options: RelayOptions,
}

impl ProcessRelay {
    /// Relay with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Relay with the given options
    #[must_use]
    pub const fn with_options(options: RelayOptions) -> Self {
        Self { options }
    }

    /// Options used for every relay started here
    #[must_use]
    pub const fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// Launch `command` with `arguments` and start relaying its output
    ///
    /// Returns immediately. Problems resolving the command, creating the
    /// channel or spawning the process are reported as a `Failed` event on
    /// the handle's event sequence.
    ///
    /// # Errors
    /// Returns `PipeAllocation` if no unique pipe path could be found,
    /// `InvalidConfig` for out-of-range options, and `Spawn` if the worker
    /// thread cannot be created
    pub fn start<I, S>(&self, command: impl Into<String>, arguments: I) -> Result<RelayHandle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.validate()?;

        let id = RelayId::generate();
        let command = command.into();
        let arguments: Vec<String> = arguments.into_iter().map(Into::into).collect();

        let pipe_path = match self.options.channel {
            ChannelKind::NamedPipe => Some(match self.options.pipe_path {
                Some(ref path) => path.clone(),
                None => allocate_pipe_path(
                    &self.options.resolved_pipe_dir(),
                    self.options.name_attempts,
                )?,
            }),
            ChannelKind::Piped => None,
        };

        let shared = Arc::new(RelayShared::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let state = shared.state.subscribe();

        let worker = Worker {
            id: id.clone(),
            command: command.clone(),
            arguments: arguments.clone(),
            pipe_path: pipe_path.clone(),
            options: self.options.clone(),
            shared: Arc::clone(&shared),
            tx,
        };

        thread::Builder::new()
            .name(format!("relay-{}", id.short()))
            .spawn(move || worker.run())
            .map_err(|e| RelayError::spawn(format!("failed to start relay worker: {e}")))?;

        log::debug!(
            "[{}] started relay for {command} via {}",
            id.short(),
            self.options.channel.as_str()
        );

        Ok(RelayHandle {
            id,
            command,
            arguments,
            channel: self.options.channel,
            pipe_path,
            events: Some(RelayEvents::new(rx)),
            state,
            shared,
        })
    }
}
