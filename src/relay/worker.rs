//! Relay worker thread: establish, launch, read, report

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::channel::{self, Channel, LaunchSpec, Launched, ReadOutcome, Terminate, Wake};
use crate::error::{RelayError, Result};
use crate::types::events::{Completion, RelayEvent, RelayFailure};
use crate::types::identifiers::RelayId;
use crate::types::options::RelayOptions;
use crate::types::state::RelayState;

/// Granularity of the cancellation check while waiting for the exit status
const EXIT_WAIT_SLICE: Duration = Duration::from_millis(50);

/// State shared between a [`RelayHandle`](super::RelayHandle) and its worker
pub(crate) struct RelayShared {
    pub cancel: CancellationToken,
    pub state: watch::Sender<RelayState>,
    pub waker: Mutex<Option<Arc<dyn Wake>>>,
    pub terminator: Mutex<Option<Arc<dyn Terminate>>>,
}

impl RelayShared {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(RelayState::Idle);
        Self {
            cancel: CancellationToken::new(),
            state,
            waker: Mutex::new(None),
            terminator: Mutex::new(None),
        }
    }
}

/// Sends output events and the single terminal event
///
/// Terminal methods consume the emitter, so nothing can follow them.
struct Emitter {
    tx: mpsc::UnboundedSender<RelayEvent>,
    shared: Arc<RelayShared>,
    echo_errors: bool,
}

impl Emitter {
    fn line(&self, line: String) {
        // A dropped receiver only means nobody is watching
        let _ = self.tx.send(RelayEvent::Output { line });
    }

    fn finish(self, completion: Completion) {
        self.shared
            .state
            .send_replace(RelayState::Finished { completion });
        let _ = self.tx.send(RelayEvent::Finished { completion });
    }

    fn fail(self, err: &RelayError) {
        let failure = RelayFailure {
            kind: err.failure_kind(),
            message: err.to_string(),
        };
        if self.echo_errors {
            self.line(failure.message.clone());
        }
        self.shared.state.send_replace(RelayState::Failed {
            failure: failure.clone(),
        });
        let _ = self.tx.send(failure.into());
    }
}

enum LoopExit {
    Eof,
    Cancelled,
}

/// Everything the worker thread owns
pub(crate) struct Worker {
    pub id: RelayId,
    pub command: String,
    pub arguments: Vec<String>,
    pub pipe_path: Option<PathBuf>,
    pub options: RelayOptions,
    pub shared: Arc<RelayShared>,
    pub tx: mpsc::UnboundedSender<RelayEvent>,
}

impl Worker {
    pub(crate) fn run(self) {
        let label = self.id.short().to_string();
        let emitter = Emitter {
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
            echo_errors: self.options.echo_errors,
        };

        let program = match resolve_program(&self.command, &self.options) {
            Ok(program) => program,
            Err(e) => {
                log::error!("[{label}] {e}");
                return emitter.fail(&e);
            }
        };

        let mut channel =
            match channel::establish(self.options.channel, self.pipe_path.as_deref(), &self.options)
            {
                Ok(channel) => channel,
                Err(e) => {
                    log::error!("[{label}] {e}");
                    return emitter.fail(&e);
                }
            };

        *self.shared.waker.lock() = Some(channel.waker());
        if self.shared.cancel.is_cancelled() {
            log::debug!("[{label}] stopped before launch");
            channel.close();
            return emitter.finish(Completion::Detached);
        }

        let spec = LaunchSpec {
            program: &program,
            arguments: &self.arguments,
            options: &self.options,
            label: &label,
        };
        let launched = match channel.launch(&spec) {
            Ok(launched) => launched,
            Err(e) => {
                log::error!("[{label}] {e}");
                channel.close();
                return emitter.fail(&e);
            }
        };
        *self.shared.terminator.lock() = Some(Arc::clone(&launched.terminator));

        self.shared.state.send_if_modified(|state| {
            if matches!(state, RelayState::Idle) {
                *state = RelayState::Running;
                true
            } else {
                false
            }
        });
        log::debug!("[{label}] relaying {}", program.display());

        let outcome = read_loop(channel.as_mut(), &self.shared.cancel, &emitter);
        channel.close();

        match outcome {
            Ok(LoopExit::Eof) => {
                let completion = wait_for_exit(&launched, &self.shared.cancel);
                log::debug!("[{label}] finished: {completion}");
                emitter.finish(completion);
            }
            Ok(LoopExit::Cancelled) => {
                log::debug!("[{label}] detached on stop");
                emitter.finish(Completion::Detached);
            }
            Err(e) => {
                log::error!("[{label}] {e}");
                emitter.fail(&e);
            }
        }
    }
}

/// Relay lines until end of stream or cancellation
///
/// Cancellation is checked before every read and again right after it, so
/// the wake payload is never delivered as output.
fn read_loop(
    channel: &mut dyn Channel,
    cancel: &CancellationToken,
    emitter: &Emitter,
) -> Result<LoopExit> {
    loop {
        if cancel.is_cancelled() {
            return Ok(LoopExit::Cancelled);
        }

        let outcome = channel.read_line();
        if cancel.is_cancelled() {
            return Ok(LoopExit::Cancelled);
        }

        match outcome? {
            ReadOutcome::Line(line) => emitter.line(line),
            ReadOutcome::Eof => return Ok(LoopExit::Eof),
        }
    }
}

/// Exit status from the waiter, or `Detached` if a stop arrives first
fn wait_for_exit(launched: &Launched, cancel: &CancellationToken) -> Completion {
    loop {
        match launched.exit.recv_timeout(EXIT_WAIT_SLICE) {
            Ok(completion) => return completion,
            Err(RecvTimeoutError::Timeout) if cancel.is_cancelled() => {
                return Completion::Detached;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("exit status lost; reporting relay as detached");
                return Completion::Detached;
            }
        }
    }
}

/// Resolve `command` the way the child's environment would
///
/// Bare names are looked up on `PATH` (the relay's `env` override wins),
/// anything with a separator is checked relative to the configured cwd.
pub(crate) fn resolve_program(command: &str, options: &RelayOptions) -> Result<PathBuf> {
    if command.trim().is_empty() {
        return Err(RelayError::command_not_found("empty command"));
    }

    let path_var = options
        .env
        .get("PATH")
        .map(std::ffi::OsString::from)
        .or_else(|| std::env::var_os("PATH"));
    let cwd = match options.cwd {
        Some(ref cwd) => cwd.clone(),
        None => std::env::current_dir()?,
    };

    which::which_in(Path::new(command), path_var, cwd)
        .map_err(|e| RelayError::command_not_found(format!("{command}: {e}")))
}
