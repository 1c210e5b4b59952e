//! Pid file persistence for daemonized supervisors.
//!
//! The pid file is a plain text file holding the daemon's process identifier
//! as a decimal integer. External tooling (a stop script, an init system)
//! reads it to know which process to signal for shutdown.

use crate::error::{Result, SupervisorError};
use nix::unistd::Pid;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Handle to the pid file recording a running daemon's identifier.
///
/// Written exactly once (by the originator, during daemonization) and
/// deleted exactly once (by the daemon's termination teardown).
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `pid` to the file, overwriting any existing content.
    ///
    /// A write failure breaks the external shutdown contract, so it is
    /// surfaced as a structured error rather than ignored.
    pub fn persist(&self, pid: Pid) -> Result<()> {
        fs::write(&self.path, pid.to_string()).map_err(|source| SupervisorError::PidFile {
            path: self.path.clone(),
            source,
        })
    }

    /// Delete the file. An already-missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SupervisorError::PidFile {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Read the recorded pid back.
    pub fn read(&self) -> Result<Pid> {
        let text = fs::read_to_string(&self.path).map_err(|source| SupervisorError::PidFile {
            path: self.path.clone(),
            source,
        })?;
        text.trim()
            .parse::<i32>()
            .map(Pid::from_raw)
            .map_err(|_| SupervisorError::InvalidPidFile {
                path: self.path.clone(),
            })
    }
}
