//! Unique pipe path allocation

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{RelayError, Result};

/// Prefix of every generated pipe file name
pub(crate) const PIPE_PREFIX: &str = "relay-";

/// Pick a pipe path in `dir` that does not exist yet
///
/// Tries up to `attempts` random names. Creation is left to the backend, so
/// a concurrent creator can still win the race; `mkfifo` then fails and the
/// relay reports a spawn failure.
pub(crate) fn allocate_pipe_path(dir: &Path, attempts: usize) -> Result<PathBuf> {
    for _ in 0..attempts {
        let candidate = dir.join(format!("{PIPE_PREFIX}{}", Uuid::new_v4().simple()));
        match std::fs::symlink_metadata(&candidate) {
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(candidate),
            Ok(_) => log::debug!("pipe name collision: {}", candidate.display()),
            Err(e) => {
                log::debug!("cannot inspect {}: {e}", candidate.display());
            }
        }
    }

    Err(RelayError::PipeAllocation {
        attempts,
        dir: dir.display().to_string(),
    })
}
