//! Error types for forkpool.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for forkpool.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("fork failed: {0}")]
    Fork(#[source] nix::errno::Errno),

    #[error("failed to install termination handler: {0}")]
    Signal(#[source] nix::errno::Errno),

    #[error("wait for child exit failed: {0}")]
    Wait(#[source] nix::errno::Errno),

    #[error("pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pid file {path} does not contain a pid")]
    InvalidPidFile { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for forkpool operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;
