//! Composite shell command building for the named pipe backend

use std::path::Path;
use std::process::{Command, Stdio};

use crate::types::options::{ArgumentMode, RelayOptions};

/// Builds `sh -c '<cmd> > <pipe> 2>&1; status=$?; rm -f <pipe>; exit $status'`
///
/// The wrapper redirects both output streams into the pipe, removes the pipe
/// once the command exits, and keeps the command's exit status as its own.
pub(super) struct ShellCommandBuilder<'a> {
    program: &'a Path,
    arguments: &'a [String],
    pipe_path: &'a Path,
    mode: ArgumentMode,
}

impl<'a> ShellCommandBuilder<'a> {
    /// Create a new shell command builder
    pub(super) fn new(
        program: &'a Path,
        arguments: &'a [String],
        pipe_path: &'a Path,
        mode: ArgumentMode,
    ) -> Self {
        Self {
            program,
            arguments,
            pipe_path,
            mode,
        }
    }

    /// The script passed to `<shell> -c`
    pub(super) fn script(&self) -> String {
        let mut command = quote(&self.program.to_string_lossy());
        for arg in self.arguments {
            command.push(' ');
            match self.mode {
                ArgumentMode::Quoted => command.push_str(&quote(arg)),
                ArgumentMode::Raw => command.push_str(arg),
            }
        }

        let pipe = quote(&self.pipe_path.to_string_lossy());
        format!("{command} > {pipe} 2>&1; status=$?; rm -f {pipe}; exit $status")
    }

    /// Build the shell invocation
    ///
    /// The shell gets its own process group so terminal signals aimed at the
    /// caller do not reach it, and so it can be signalled as a group.
    pub(super) fn build(&self, options: &RelayOptions) -> Command {
        use std::os::unix::process::CommandExt;

        let mut cmd = Command::new(&options.shell);
        cmd.arg("-c")
            .arg(self.script())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&options.env);

        cmd
    }
}

/// Quote a token for POSIX `sh`
///
/// Tokens made only of characters the shell never interprets stay bare;
/// everything else is wrapped in single quotes.
pub(super) fn quote(token: &str) -> String {
    let is_plain = |c: char| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c);
    if !token.is_empty() && token.chars().all(is_plain) {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', r"'\''"))
}
