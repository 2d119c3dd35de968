//! Channel backends carrying a child's output to the relay
//!
//! A [`Channel`] establishes the communication channel, launches the
//! process, and yields its combined output line by line. Two backends exist:
//!
//! - [`fifo`] (POSIX): a named pipe written by a detached shell wrapper
//! - [`piped`] (portable): stdout/stderr pipes of a directly spawned child
//!
//! The backend is picked at run time from [`ChannelKind`].

#[cfg(unix)]
pub(crate) mod fifo;
pub(crate) mod line;
pub(crate) mod path;
pub(crate) mod piped;

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;

use crate::error::{RelayError, Result};
use crate::types::events::Completion;
use crate::types::options::{ChannelKind, RelayOptions};

/// Payload written into a channel to unblock a pending read on stop
pub(crate) const WAKE_PAYLOAD: &str = "Closing";

/// Everything a backend needs to launch one command
pub(crate) struct LaunchSpec<'a> {
    /// Resolved executable path
    pub program: &'a Path,
    /// Argument tokens in order
    pub arguments: &'a [String],
    /// Relay configuration
    pub options: &'a RelayOptions,
    /// Name used for helper threads and log lines
    pub label: &'a str,
}

/// Result of a single blocking read
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// One line, terminator stripped
    Line(String),
    /// All writers are gone
    Eof,
}

/// Unblocks a read pending on a channel
pub(crate) trait Wake: Send + Sync {
    /// Push the wake payload into the channel; failures are swallowed
    fn wake(&self);
}

/// Kills a launched process
pub(crate) trait Terminate: Send + Sync {
    /// Ask the process (group) to exit
    fn terminate(&self) -> Result<()>;
}

/// A launched process as seen by the relay
pub(crate) struct Launched {
    /// Receives the completion once the process is reaped
    pub exit: mpsc::Receiver<Completion>,
    /// Kills the process on request
    pub terminator: Arc<dyn Terminate>,
}

/// Strategy for one relay's communication channel
///
/// Calls happen on the relay's worker thread in the order
/// `waker`, `launch`, `read_line`..., `close`.
pub(crate) trait Channel: Send {
    /// Handle that unblocks `read_line` from another thread
    fn waker(&self) -> Arc<dyn Wake>;

    /// Launch the process and open the channel for reading
    ///
    /// May block until the process attaches to the channel.
    fn launch(&mut self, spec: &LaunchSpec<'_>) -> Result<Launched>;

    /// Block until the next line or end of stream
    fn read_line(&mut self) -> Result<ReadOutcome>;

    /// Release the reading end and remove any on-disk channel file
    fn close(&mut self);
}

/// Create the channel for the configured backend
///
/// For `NamedPipe` this creates the FIFO at `pipe_path`.
pub(crate) fn establish(
    kind: ChannelKind,
    pipe_path: Option<&Path>,
    options: &RelayOptions,
) -> Result<Box<dyn Channel>> {
    match kind {
        ChannelKind::NamedPipe => {
            let path = pipe_path
                .ok_or_else(|| RelayError::spawn("named pipe relay started without a pipe path"))?;
            establish_fifo(path, options)
        }
        ChannelKind::Piped => Ok(Box::new(piped::PipedChannel::new(options))),
    }
}

#[cfg(unix)]
fn establish_fifo(path: &Path, options: &RelayOptions) -> Result<Box<dyn Channel>> {
    Ok(Box::new(fifo::FifoChannel::establish(path, options)?))
}

#[cfg(not(unix))]
fn establish_fifo(_path: &Path, _options: &RelayOptions) -> Result<Box<dyn Channel>> {
    Err(RelayError::spawn(
        "named pipes are not supported on this platform; use ChannelKind::Piped",
    ))
}
