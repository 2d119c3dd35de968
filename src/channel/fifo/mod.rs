//! Named pipe backend
//!
//! The command runs through `<shell> -c` with both output streams redirected
//! into a FIFO. The shell is reaped on a detached thread, so the child's
//! lifetime does not depend on the relay reading; the relay only observes.

mod command;
mod lifecycle;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::channel::line::LineReader;
use crate::channel::{Channel, LaunchSpec, Launched, ReadOutcome, Terminate, Wake};
use crate::error::{RelayError, Result};
use crate::types::options::RelayOptions;

use command::ShellCommandBuilder;
use lifecycle::{
    FifoWaker, GroupTerminator, SharedReaderState, create_fifo, mark_closed, mark_opened,
    remove_fifo, spawn_waiter,
};

/// Channel over a POSIX FIFO
pub(crate) struct FifoChannel {
    path: PathBuf,
    reader_state: SharedReaderState,
    waker: Arc<FifoWaker>,
    reader: Option<LineReader<File>>,
    max_line_bytes: usize,
}

impl FifoChannel {
    /// Create the FIFO at `path`
    ///
    /// # Errors
    /// Returns a spawn error if the FIFO cannot be created, e.g. because
    /// something already exists at `path`
    pub(crate) fn establish(path: &Path, options: &RelayOptions) -> Result<Self> {
        create_fifo(path)?;
        log::debug!("created pipe {}", path.display());

        let reader_state = SharedReaderState::default();
        Ok(Self {
            path: path.to_path_buf(),
            waker: Arc::new(FifoWaker::new(
                path.to_path_buf(),
                Arc::clone(&reader_state),
            )),
            reader_state,
            reader: None,
            max_line_bytes: options.max_line_bytes,
        })
    }
}

impl Channel for FifoChannel {
    fn waker(&self) -> Arc<dyn Wake> {
        self.waker.clone()
    }

    fn launch(&mut self, spec: &LaunchSpec<'_>) -> Result<Launched> {
        let builder = ShellCommandBuilder::new(
            spec.program,
            spec.arguments,
            &self.path,
            spec.options.argument_mode,
        );
        let mut cmd = builder.build(spec.options);

        let child = cmd.spawn().map_err(|e| {
            RelayError::spawn(format!(
                "failed to start shell {}: {e}",
                spec.options.shell.display()
            ))
        })?;
        let pid = child.id();
        log::debug!("[{}] shell started (pid {pid})", spec.label);

        let terminator = Arc::new(GroupTerminator::new(pid)?);
        let exit = spawn_waiter(
            child,
            self.path.clone(),
            Arc::clone(&self.reader_state),
            spec.label,
        )?;

        // Blocks until the shell opens its end, or the waiter releases us
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                // The shell would otherwise wait for a reader forever
                if let Err(kill_err) = terminator.terminate() {
                    log::warn!("[{}] {kill_err}", spec.label);
                }
                return Err(RelayError::spawn(format!(
                    "failed to open pipe {}: {e}",
                    self.path.display()
                )));
            }
        };
        self.reader = Some(LineReader::new(file, self.max_line_bytes));

        mark_opened(&self.reader_state);

        Ok(Launched { exit, terminator })
    }

    fn read_line(&mut self) -> Result<ReadOutcome> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| RelayError::read("pipe is not open"))?;

        match reader.next_line() {
            Ok(Some(line)) => Ok(ReadOutcome::Line(line)),
            Ok(None) => Ok(ReadOutcome::Eof),
            Err(e) => Err(RelayError::read(format!(
                "failed to read pipe {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn close(&mut self) {
        self.reader = None;
        mark_closed(&self.reader_state);
        remove_fifo(&self.path);
    }
}
