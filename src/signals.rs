//! Termination signal plumbing and exit-status analysis.
//!
//! The daemon's SIGTERM handler does not touch supervisor state directly:
//! it only sets a process-global flag. The state machine's fill/drain/idle
//! loops observe the flag and run the teardown in the main sequence. The
//! handler is installed without `SA_RESTART`, so a pending termination
//! interrupts a blocking `wait()` or `pause()` with `EINTR` and the loop
//! gets a chance to notice it.

use crate::error::{Result, SupervisorError};
use nix::libc::c_int;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::WaitStatus;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set by the SIGTERM handler; observed by the supervisor loops.
static TERMINATION: AtomicBool = AtomicBool::new(false);

extern "C" fn on_termination(_signo: c_int) {
    TERMINATION.store(true, Ordering::SeqCst);
}

/// Install the SIGTERM disposition for a daemon process.
///
/// Called once in the daemon child, before any pool forking. Workers inherit
/// the disposition across fork, which is harmless: they never observe the
/// flag and are torn down with SIGKILL.
pub(crate) fn install_termination_handler() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_termination),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // Safety: the handler only performs an atomic store, which is
    // async-signal-safe.
    unsafe { sigaction(Signal::SIGTERM, &action) }.map_err(SupervisorError::Signal)?;
    Ok(())
}

/// Check whether a termination signal has been delivered to this process.
pub(crate) fn termination_pending() -> bool {
    TERMINATION.load(Ordering::SeqCst)
}

/// Why a worker process terminated, as reported by the wait primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExitReason {
    /// Normal exit with status code.
    Exited(i32),
    /// Killed by signal.
    Signaled(Signal),
    /// Anything else the wait primitive can report (stopped, continued).
    Other,
}

impl ExitReason {
    pub(crate) fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {}", code),
            Self::Signaled(sig) => write!(f, "killed by signal {:?}", sig),
            Self::Other => write!(f, "changed state without exiting"),
        }
    }
}

/// Classify a `WaitStatus` into an [`ExitReason`].
pub(crate) fn analyze_wait_status(status: WaitStatus) -> ExitReason {
    match status {
        WaitStatus::Exited(_, code) => ExitReason::Exited(code),
        WaitStatus::Signaled(_, signal, _) => ExitReason::Signaled(signal),
        _ => ExitReason::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::Pid;

    #[test]
    fn test_analyze_wait_status() {
        let status = WaitStatus::Exited(Pid::from_raw(1), 0);
        assert_eq!(analyze_wait_status(status), ExitReason::Exited(0));

        let status = WaitStatus::Exited(Pid::from_raw(1), 3);
        assert_eq!(analyze_wait_status(status), ExitReason::Exited(3));

        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGKILL, false);
        assert_eq!(
            analyze_wait_status(status),
            ExitReason::Signaled(Signal::SIGKILL)
        );

        let status = WaitStatus::StillAlive;
        assert_eq!(analyze_wait_status(status), ExitReason::Other);
    }

    #[test]
    fn test_exit_reason_success() {
        assert!(ExitReason::Exited(0).is_success());
        assert!(!ExitReason::Exited(1).is_success());
        assert!(!ExitReason::Signaled(Signal::SIGKILL).is_success());
    }

    #[test]
    fn test_exit_reason_display() {
        assert_eq!(ExitReason::Exited(0).to_string(), "exited with code 0");
        let signaled = ExitReason::Signaled(Signal::SIGKILL).to_string();
        assert!(signaled.contains("SIGKILL"));
    }
}
