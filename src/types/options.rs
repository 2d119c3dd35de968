//! Relay options and configuration
//!
//! This module contains the configuration options for starting relays,
//! including a builder and an environment overlay.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{RelayError, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Default maximum line length before a line is split (1MB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Default number of random pipe names tried before giving up
pub const DEFAULT_NAME_ATTEMPTS: usize = 16;

/// Default shell used to run the composite redirection command
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Environment variable selecting the channel backend (`fifo` or `piped`)
pub const ENV_CHANNEL: &str = "PROCESS_RELAY_CHANNEL";

/// Environment variable overriding the pipe directory
pub const ENV_PIPE_DIR: &str = "PROCESS_RELAY_PIPE_DIR";

/// Environment variable overriding the shell
pub const ENV_SHELL: &str = "PROCESS_RELAY_SHELL";

/// Environment variable overriding the maximum line length
pub const ENV_MAX_LINE_BYTES: &str = "PROCESS_RELAY_MAX_LINE_BYTES";

// ============================================================================
// Enums
// ============================================================================

/// Channel backend used to carry the child's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// POSIX FIFO fed by shell redirection; the child is fully detached
    NamedPipe,
    /// Piped stdout/stderr of a directly spawned child (portable fallback)
    Piped,
}

impl Default for ChannelKind {
    fn default() -> Self {
        if cfg!(unix) {
            Self::NamedPipe
        } else {
            Self::Piped
        }
    }
}

impl ChannelKind {
    /// Config string for this backend
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NamedPipe => "fifo",
            Self::Piped => "piped",
        }
    }
}

impl FromStr for ChannelKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" | "named-pipe" | "named_pipe" => Ok(Self::NamedPipe),
            "piped" | "pipe" => Ok(Self::Piped),
            other => Err(RelayError::invalid_config(format!(
                "unknown channel kind '{other}' (expected 'fifo' or 'piped')"
            ))),
        }
    }
}

/// How command and arguments are written into the shell command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentMode {
    /// Every token is single-quoted; no shell interpretation
    #[default]
    Quoted,
    /// Tokens are joined verbatim; the caller owns quoting and escaping
    Raw,
}

// ============================================================================
// Relay Options
// ============================================================================

/// Options for starting a relay
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Channel backend
    pub channel: ChannelKind,
    /// Directory for pipe files (defaults to the platform temp dir)
    pub pipe_dir: Option<PathBuf>,
    /// Explicit pipe path; skips random name allocation
    pub pipe_path: Option<PathBuf>,
    /// Shell used for the composite command
    pub shell: PathBuf,
    /// Working directory for the child
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the child
    pub env: HashMap<String, String>,
    /// Quoting of command line tokens
    pub argument_mode: ArgumentMode,
    /// Longest line delivered as one event
    pub max_line_bytes: usize,
    /// Random pipe names tried before `PipeAllocation` is returned
    pub name_attempts: usize,
    /// Also emit failure text as an output line before the terminal event
    pub echo_errors: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            channel: ChannelKind::default(),
            pipe_dir: None,
            pipe_path: None,
            shell: PathBuf::from(DEFAULT_SHELL),
            cwd: None,
            env: HashMap::new(),
            argument_mode: ArgumentMode::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            name_attempts: DEFAULT_NAME_ATTEMPTS,
            echo_errors: false,
        }
    }
}

impl RelayOptions {
    /// Create a new builder for `RelayOptions`
    #[must_use]
    pub fn builder() -> RelayOptionsBuilder {
        RelayOptionsBuilder::default()
    }

    /// Defaults overlaid with `PROCESS_RELAY_*` environment variables
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a variable holds an unparseable value
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a value cannot be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(kind) = lookup(ENV_CHANNEL) {
            options.channel = kind.parse()?;
        }
        if let Some(dir) = lookup(ENV_PIPE_DIR).filter(|d| !d.is_empty()) {
            options.pipe_dir = Some(PathBuf::from(dir));
        }
        if let Some(shell) = lookup(ENV_SHELL).filter(|s| !s.is_empty()) {
            options.shell = PathBuf::from(shell);
        }
        if let Some(max) = lookup(ENV_MAX_LINE_BYTES) {
            options.max_line_bytes = max.trim().parse().map_err(|e| {
                RelayError::invalid_config(format!("{ENV_MAX_LINE_BYTES}='{max}': {e}"))
            })?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Check value bounds
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a zero line limit or zero name attempts
    pub fn validate(&self) -> Result<()> {
        if self.max_line_bytes == 0 {
            return Err(RelayError::invalid_config("max_line_bytes must be > 0"));
        }
        if self.name_attempts == 0 {
            return Err(RelayError::invalid_config("name_attempts must be > 0"));
        }
        Ok(())
    }

    /// Directory pipe files are created in
    #[must_use]
    pub fn resolved_pipe_dir(&self) -> PathBuf {
        self.pipe_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

// ============================================================================
// Builder for RelayOptions
// ============================================================================

/// Builder for `RelayOptions`
#[derive(Debug, Default)]
pub struct RelayOptionsBuilder {
    options: RelayOptions,
}

impl RelayOptionsBuilder {
    /// Set the channel backend
    #[must_use]
    pub const fn channel(mut self, kind: ChannelKind) -> Self {
        self.options.channel = kind;
        self
    }

    /// Set the pipe directory
    #[must_use]
    pub fn pipe_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.pipe_dir = Some(dir.into());
        self
    }

    /// Use an explicit pipe path
    #[must_use]
    pub fn pipe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.pipe_path = Some(path.into());
        self
    }

    /// Set the shell
    #[must_use]
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.options.shell = shell.into();
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(path.into());
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(key.into(), value.into());
        self
    }

    /// Set the argument mode
    #[must_use]
    pub const fn argument_mode(mut self, mode: ArgumentMode) -> Self {
        self.options.argument_mode = mode;
        self
    }

    /// Set max line length
    ///
    /// # Panics
    /// Panics if `bytes` is zero
    #[must_use]
    pub fn max_line_bytes(mut self, bytes: usize) -> Self {
        assert!(bytes > 0, "max_line_bytes must be > 0");
        self.options.max_line_bytes = bytes;
        self
    }

    /// Set the number of pipe name attempts
    ///
    /// # Panics
    /// Panics if `attempts` is zero
    #[must_use]
    pub fn name_attempts(mut self, attempts: usize) -> Self {
        assert!(attempts > 0, "name_attempts must be > 0");
        self.options.name_attempts = attempts;
        self
    }

    /// Emit failure text as an output line too
    #[must_use]
    pub const fn echo_errors(mut self, echo: bool) -> Self {
        self.options.echo_errors = echo;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> RelayOptions {
        self.options
    }
}
