//! Lifecycle management for the named pipe backend (create, wake, reap, remove)

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{self, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, Pid};
use parking_lot::Mutex;

use crate::channel::{Terminate, WAKE_PAYLOAD, Wake};
use crate::error::{RelayError, Result};
use crate::types::events::{Completion, FAILURE_EXIT_CODE};

/// Create the FIFO, readable and writable by the owner only
pub(super) fn create_fifo(path: &Path) -> Result<()> {
    unistd::mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|e| {
        RelayError::spawn(format!("failed to create pipe {}: {e}", path.display()))
    })
}

/// Remove the FIFO if it is still there
///
/// Anything at the path that is not a FIFO is left alone.
pub(super) fn remove_fifo(path: &Path) {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => {
            if let Err(e) = std::fs::remove_file(path)
                && e.kind() != ErrorKind::NotFound
            {
                log::warn!("failed to remove pipe {}: {e}", path.display());
            }
        }
        Ok(_) => log::warn!("not removing {}: no longer a pipe", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("failed to inspect pipe {}: {e}", path.display()),
    }
}

/// Open the FIFO for writing without blocking
///
/// Fails with `ENXIO` when nobody has the FIFO open for reading.
fn open_writer_nonblocking(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
}

/// How often the reaper retries releasing a reader that is not blocked yet
const RELEASE_RETRY_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// READER STATE
// ============================================================================

/// Reading-end progress, shared by the channel, its waker and its reaper
#[derive(Debug, Default)]
pub(super) struct ReaderState {
    opened: bool,
    closed: bool,
}

/// Handle to [`ReaderState`]
pub(super) type SharedReaderState = Arc<Mutex<ReaderState>>;

/// Record that the reader opened the FIFO
pub(super) fn mark_opened(state: &Mutex<ReaderState>) {
    state.lock().opened = true;
}

/// Record that the reader is done with the FIFO, opened or not
pub(super) fn mark_closed(state: &Mutex<ReaderState>) {
    state.lock().closed = true;
}

// ============================================================================
// WAKER
// ============================================================================

/// Unblocks the reader by writing [`WAKE_PAYLOAD`] into the FIFO
///
/// The write only happens once the reader holds the FIFO open. Writing
/// earlier could connect to the FIFO before the shell does and leave the
/// shell blocked in its redirection after the reader is gone. The caller
/// cancels before waking, and the reader checks cancellation after
/// `mark_opened`, so one of the two always sees the other.
pub(super) struct FifoWaker {
    path: PathBuf,
    reader: SharedReaderState,
}

impl FifoWaker {
    pub(super) const fn new(path: PathBuf, reader: SharedReaderState) -> Self {
        Self { path, reader }
    }

    fn write_payload(&self) -> io::Result<()> {
        let mut fifo = open_writer_nonblocking(&self.path)?;
        fifo.write_all(format!("{WAKE_PAYLOAD}\n").as_bytes())?;
        fifo.flush()
    }
}

impl Wake for FifoWaker {
    fn wake(&self) {
        if !self.reader.lock().opened {
            return;
        }

        // The relay may already be done with the pipe
        if let Err(e) = self.write_payload() {
            log::debug!("unblocking write to {} skipped: {e}", self.path.display());
        }
    }
}

// ============================================================================
// WAITER
// ============================================================================

/// Reap the shell on a detached thread
///
/// The thread is never joined. Once the shell exits it publishes the
/// completion, then releases a reader that may still be heading into or
/// blocked in `open` (the shell died before redirecting).
pub(super) fn spawn_waiter(
    mut child: Child,
    path: PathBuf,
    reader: SharedReaderState,
    label: &str,
) -> Result<mpsc::Receiver<Completion>> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name(format!("relay-wait-{label}"))
        .spawn(move || {
            let completion = match child.wait() {
                Ok(status) => Completion::from_status(status),
                Err(e) => {
                    log::error!("failed to wait for shell: {e}");
                    Completion::Exited(FAILURE_EXIT_CODE)
                }
            };
            log::debug!("shell for {} {completion}", path.display());
            let _ = tx.send(completion);

            release_reader(&path, &reader);
        })
        .map_err(|e| RelayError::spawn(format!("failed to start waiter thread: {e}")))?;

    Ok(rx)
}

/// Open the FIFO for writing once a reader is waiting, then close it
///
/// A non-blocking open fails with `ENXIO` until the reader has reached its
/// own `open`, so this retries until it succeeds or the reader no longer
/// needs it.
fn release_reader(path: &Path, reader: &Mutex<ReaderState>) {
    loop {
        {
            let state = reader.lock();
            if state.opened || state.closed {
                return;
            }
        }

        match open_writer_nonblocking(path) {
            Ok(release) => {
                drop(release);
                return;
            }
            Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("{} already removed, nothing to release", path.display());
                return;
            }
            Err(e) => {
                log::warn!("cannot release reader of {}: {e}", path.display());
                return;
            }
        }
        thread::sleep(RELEASE_RETRY_INTERVAL);
    }
}

// ============================================================================
// TERMINATOR
// ============================================================================

/// Sends SIGTERM to the shell's process group
pub(super) struct GroupTerminator {
    pgid: Pid,
}

impl GroupTerminator {
    pub(super) fn new(pid: u32) -> Result<Self> {
        let raw = i32::try_from(pid)
            .map_err(|_| RelayError::signal(format!("pid {pid} out of range")))?;
        Ok(Self {
            pgid: Pid::from_raw(raw),
        })
    }
}

impl Terminate for GroupTerminator {
    fn terminate(&self) -> Result<()> {
        match signal::killpg(self.pgid, Signal::SIGTERM) {
            Ok(()) => Ok(()),
            // Group already gone
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(RelayError::signal(format!(
                "failed to signal process group {}: {e}",
                self.pgid
            ))),
        }
    }
}
