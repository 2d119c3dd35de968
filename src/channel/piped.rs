//! Piped stdout/stderr backend
//!
//! Portable fallback for platforms without the named pipe backend. The
//! command is spawned directly from its argument vector, with one pump
//! thread per output stream feeding an internal channel. The child is not
//! detached from the relay here: once the relay stops reading, the child's
//! next write fails on a closed pipe.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::channel::line::LineReader;
use crate::channel::{Channel, LaunchSpec, Launched, ReadOutcome, WAKE_PAYLOAD, Wake};
use crate::error::{RelayError, Result};
use crate::types::options::RelayOptions;

enum Chunk {
    Line(String),
    Eof,
    Wake,
}

/// Channel over the child's stdout and stderr pipes
pub(crate) struct PipedChannel {
    tx: Sender<Chunk>,
    rx: Receiver<Chunk>,
    open_streams: usize,
    max_line_bytes: usize,
}

impl PipedChannel {
    pub(crate) fn new(options: &RelayOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            open_streams: 0,
            max_line_bytes: options.max_line_bytes,
        }
    }
}

impl Channel for PipedChannel {
    fn waker(&self) -> Arc<dyn Wake> {
        Arc::new(PipedWaker {
            tx: self.tx.clone(),
        })
    }

    fn launch(&mut self, spec: &LaunchSpec<'_>) -> Result<Launched> {
        let mut cmd = Command::new(spec.program);
        cmd.args(spec.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref cwd) = spec.options.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&spec.options.env);

        let mut child = cmd.spawn().map_err(|e| {
            RelayError::spawn(format!(
                "failed to start {}: {e}",
                spec.program.display()
            ))
        })?;
        log::debug!("[{}] child started (pid {})", spec.label, child.id());

        if let Some(stdout) = child.stdout.take() {
            spawn_pump(stdout, "out", spec.label, self.max_line_bytes, self.tx.clone())?;
            self.open_streams += 1;
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_pump(stderr, "err", spec.label, self.max_line_bytes, self.tx.clone())?;
            self.open_streams += 1;
        }

        let (exit, terminator) = reaper::spawn(child, spec.label)?;
        Ok(Launched { exit, terminator })
    }

    fn read_line(&mut self) -> Result<ReadOutcome> {
        while self.open_streams > 0 {
            match self.rx.recv() {
                Ok(Chunk::Line(line)) => return Ok(ReadOutcome::Line(line)),
                Ok(Chunk::Wake) => return Ok(ReadOutcome::Line(WAKE_PAYLOAD.to_string())),
                Ok(Chunk::Eof) => self.open_streams -= 1,
                Err(_) => break,
            }
        }
        Ok(ReadOutcome::Eof)
    }

    fn close(&mut self) {
        // Pumps notice the dropped receiver on their next send
        self.open_streams = 0;
    }
}

fn spawn_pump<R: Read + Send + 'static>(
    stream: R,
    name: &str,
    label: &str,
    max_line_bytes: usize,
    tx: Sender<Chunk>,
) -> Result<()> {
    thread::Builder::new()
        .name(format!("relay-{name}-{label}"))
        .spawn(move || {
            let mut reader = LineReader::new(stream, max_line_bytes);
            loop {
                match reader.next_line() {
                    Ok(Some(line)) => {
                        if tx.send(Chunk::Line(line)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        log::debug!("output pump stopped: {e}");
                        break;
                    }
                }
            }
            let _ = tx.send(Chunk::Eof);
        })
        .map(drop)
        .map_err(|e| RelayError::spawn(format!("failed to start output pump: {e}")))
}

struct PipedWaker {
    tx: Sender<Chunk>,
}

impl Wake for PipedWaker {
    fn wake(&self) {
        if self.tx.send(Chunk::Wake).is_err() {
            log::debug!("unblocking message skipped: relay already closed");
        }
    }
}

/// Reaps the child on a detached thread and kills it on request
#[cfg(unix)]
mod reaper {
    use std::process::Child;
    use std::sync::Arc;
    use std::sync::mpsc::{self, Receiver};
    use std::thread;

    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;
    use parking_lot::Mutex;

    use crate::channel::Terminate;
    use crate::error::{RelayError, Result};
    use crate::types::events::{Completion, FAILURE_EXIT_CODE};

    pub(super) fn spawn(
        mut child: Child,
        label: &str,
    ) -> Result<(Receiver<Completion>, Arc<dyn Terminate>)> {
        let raw = i32::try_from(child.id())
            .map_err(|_| RelayError::signal(format!("pid {} out of range", child.id())))?;
        let terminator = Arc::new(ChildTerminator {
            pid: Pid::from_raw(raw),
            reaped: Mutex::new(false),
        });
        let (tx, rx) = mpsc::channel();

        let reaped = Arc::clone(&terminator);
        thread::Builder::new()
            .name(format!("relay-wait-{label}"))
            .spawn(move || {
                let completion = match child.wait() {
                    Ok(status) => Completion::from_status(status),
                    Err(e) => {
                        log::error!("failed to wait for child: {e}");
                        Completion::Exited(FAILURE_EXIT_CODE)
                    }
                };
                *reaped.reaped.lock() = true;
                let _ = tx.send(completion);
            })
            .map_err(|e| RelayError::spawn(format!("failed to start waiter thread: {e}")))?;

        Ok((rx, terminator))
    }

    /// Sends SIGKILL to the child until it has been reaped
    struct ChildTerminator {
        pid: Pid,
        reaped: Mutex<bool>,
    }

    impl Terminate for ChildTerminator {
        fn terminate(&self) -> Result<()> {
            let reaped = self.reaped.lock();
            if *reaped {
                return Ok(());
            }
            match signal::kill(self.pid, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => Ok(()),
                Err(e) => Err(RelayError::signal(format!(
                    "failed to kill child {}: {e}",
                    self.pid
                ))),
            }
        }
    }
}

/// Polls the child for exit so the kill handle can share it
#[cfg(not(unix))]
mod reaper {
    use std::process::Child;
    use std::sync::Arc;
    use std::sync::mpsc::{self, Receiver};
    use std::thread;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::channel::Terminate;
    use crate::error::{RelayError, Result};
    
    const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

    pub(super) fn spawn(
        child: Child,
        label: &str,
    ) -> Result<(Receiver<Completion>, Arc<dyn Terminate>)> {
        let child = Arc::new(Mutex::new(child));
        let (tx, rx) = mpsc::channel();

        let polled = Arc::clone(&child);
        thread::Builder::new()
            .name(format!("relay-wait-{label}"))
            .spawn(move || {
                let completion = loop {
                    match polled.lock().try_wait() {
                        Ok(Some(status)) => break Completion::from_status(status),
                        Ok(None) => {}
                        Err(e) => {
                            log::error!("failed to wait for child: {e}");
                            break Completion::Exited(FAILURE_EXIT_CODE);
                        }
                    }
                    thread::sleep(EXIT_POLL_INTERVAL);
                };
                let _ = tx.send(completion);
            })
            .map_err(|e| RelayError::spawn(format!("failed to start waiter thread: {e}")))?;

        Ok((rx, Arc::new(ChildTerminator { child })))
    }

    struct ChildTerminator {
        child: Arc<Mutex<Child>>,
    }

    impl Terminate for ChildTerminator {
        fn terminate(&self) -> Result<()> {
            let mut child = self.child.lock();
            if let Ok(Some(_)) = child.try_wait() {
                return Ok(());
            }
            child
                .kill()
                .map_err(|e| RelayError::signal(format!("failed to kill child: {e}")))
        }
    }
}
