//! The supervisor state machine.
//!
//! One `Supervisor` describes one worker-pool session: an optional
//! daemonization step, a pool of forked worker processes each running the
//! configured callback, an optional respawn policy, and signal-driven
//! teardown for the daemonized case.
//!
//! Every process involved runs the same dispatch loop; which branch it takes
//! is decided by its [`Role`], set exactly once at the point the process is
//! created and never changed afterward.

use crate::error::{Result, SupervisorError};
use crate::pidfile::PidFile;
use crate::registry::Registry;
use crate::signals::{self, analyze_wait_status};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{wait, waitpid};
use nix::unistd::{fork, getpid, pause, setsid, ForkResult};
use std::path::PathBuf;
use std::process;
use tracing::{debug, info, trace, warn};

/// Which branch of the state machine a process executes after a fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The process that called `run()`. Exits during daemonization, or
    /// becomes the pool parent when not daemonizing.
    Originator,
    /// The detached background process created by daemonization. Acts as
    /// pool parent when a pool is configured.
    Daemon,
    /// The process that forks and monitors the workers.
    PoolParent,
    /// A process whose sole job is to execute the callback once, then exit.
    Worker,
}

/// Supervisor state machine states. Transitions are deterministic, chosen
/// entirely by configuration and role, never by runtime conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Daemonize,
    /// Zero-pool daemon: resident, waiting for termination.
    Idle,
    PoolEntry,
    PoolFill,
    Work,
    PoolDrain,
    End,
}

/// A worker-pool session: callback, pool target, respawn policy, and
/// optional daemonization.
///
/// # Example
///
/// ```no_run
/// use forkpool::Supervisor;
///
/// Supervisor::new(|| println!("hello from worker {}", std::process::id()))
///     .pool(5, true)
///     .daemonize("/run/myapp.pid")
///     .run()
///     .unwrap();
/// ```
pub struct Supervisor {
    callback: Box<dyn Fn()>,
    fork_count: usize,
    respawn: bool,
    pid_file: Option<PidFile>,
    role: Role,
    registry: Registry,
}

impl Supervisor {
    /// Create a supervisor around the unit of work each worker will execute.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            callback: Box::new(callback),
            fork_count: 0,
            respawn: false,
            pid_file: None,
            role: Role::Originator,
            registry: Registry::new(),
        }
    }

    /// Configure a pool of `count` concurrent worker processes.
    ///
    /// With `respawn` set, every worker exit is answered by forking a
    /// replacement, maintaining the pool size until the supervisor is
    /// externally terminated. Without it the pool runs exactly one
    /// generation and the supervisor exits once all workers have exited.
    ///
    /// A pool without [`daemonize`](Self::daemonize) has no signal-driven
    /// cleanup: if the pool parent is killed, its workers are orphaned, not
    /// torn down. Daemonize when workers must not outlive their supervisor.
    pub fn pool(mut self, count: usize, respawn: bool) -> Self {
        self.fork_count = count;
        self.respawn = respawn;
        self
    }

    /// Detach into a background daemon before any pool forking.
    ///
    /// The calling process writes the daemon's pid to `pid_file` and exits.
    /// Sending SIGTERM to the recorded pid kills every live worker, removes
    /// the pid file, and exits the daemon, in that order.
    pub fn daemonize(mut self, pid_file: impl Into<PathBuf>) -> Self {
        self.pid_file = Some(PidFile::new(pid_file));
        self
    }

    /// Drive the state machine to completion.
    ///
    /// This returns to the caller only on two paths:
    /// - `fork_count == 0` without daemonization: the callback runs once,
    ///   synchronously, in the calling process, and `run()` returns `Ok`.
    /// - A startup failure (fork refused, pid file unwritable, handler
    ///   installation failed) returns `Err` after tearing down any workers
    ///   already forked.
    ///
    /// Every other path ends in process exit: the originator exits after
    /// daemonizing, each worker exits after its callback, and the pool
    /// parent exits once drained (or runs until terminated when respawning).
    /// Callback panics are not caught; they terminate that worker process
    /// alone.
    pub fn run(mut self) -> Result<()> {
        let mut state = State::Start;
        loop {
            state = match state {
                State::Start => {
                    if self.pid_file.is_some() {
                        State::Daemonize
                    } else if self.fork_count == 0 {
                        // No pool, no daemon: the work happens right here.
                        (self.callback)();
                        return Ok(());
                    } else {
                        State::PoolEntry
                    }
                }
                State::Daemonize => self.daemonize_step()?,
                State::Idle => self.idle(),
                State::PoolEntry => {
                    if self.role == Role::Originator {
                        self.role = Role::PoolParent;
                    }
                    self.registry.clear();
                    State::PoolFill
                }
                State::PoolFill => self.fill()?,
                State::Work => self.work(),
                State::PoolDrain => self.drain()?,
                State::End => process::exit(0),
            };
        }
    }

    /// Fork once; the parent records the daemon's pid and exits, the child
    /// becomes the daemon.
    fn daemonize_step(&mut self) -> Result<State> {
        match unsafe { fork() }.map_err(SupervisorError::Fork)? {
            ForkResult::Parent { child } => {
                if let Some(pid_file) = &self.pid_file {
                    if let Err(e) = pid_file.persist(child) {
                        // A daemon nobody can signal must not be left
                        // behind; take it back down before reporting.
                        let _ = kill(child, Signal::SIGKILL);
                        let _ = waitpid(child, None);
                        return Err(e);
                    }
                    info!(
                        daemon = %child,
                        path = %pid_file.path().display(),
                        "daemonized"
                    );
                }
                process::exit(0);
            }
            ForkResult::Child => {
                self.role = Role::Daemon;
                // Detach from the launching session; fails only if this
                // process already leads one.
                let _ = setsid();
                signals::install_termination_handler()?;
                debug!(pid = %getpid(), workers = self.fork_count, "daemon started");
                if self.fork_count > 0 {
                    Ok(State::PoolEntry)
                } else {
                    Ok(State::Idle)
                }
            }
        }
    }

    /// Zero-pool daemon: stay resident until the termination signal.
    fn idle(&mut self) -> ! {
        loop {
            if signals::termination_pending() {
                self.teardown();
            }
            pause();
        }
    }

    /// Fork workers until the registry reaches the pool target.
    ///
    /// Forks are issued strictly sequentially: each fork happens-before the
    /// registry insert that records it, which happens-before the next fork.
    fn fill(&mut self) -> Result<State> {
        while self.registry.len() < self.fork_count {
            // Termination can arrive mid-fill; workers forked so far are in
            // the registry and get cleaned up like any others.
            if signals::termination_pending() {
                self.teardown();
            }
            match unsafe { fork() } {
                Ok(ForkResult::Parent { child }) => {
                    self.registry.insert(child);
                    trace!(
                        worker = %child,
                        live = self.registry.len(),
                        target = self.fork_count,
                        "forked worker"
                    );
                }
                Ok(ForkResult::Child) => {
                    self.role = Role::Worker;
                    // The inherited registry copy belongs to the parent's
                    // bookkeeping, not this process.
                    self.registry.clear();
                    return Ok(State::Work);
                }
                Err(errno) => {
                    warn!(%errno, live = self.registry.len(), "fork refused, aborting pool startup");
                    self.kill_registered();
                    return Err(SupervisorError::Fork(errno));
                }
            }
        }
        Ok(State::PoolDrain)
    }

    /// Worker role: execute the callback exactly once, then exit.
    fn work(&mut self) -> ! {
        trace!(pid = %getpid(), "worker executing callback");
        (self.callback)();
        process::exit(0);
    }

    /// Pool parent role: block until a worker exits, unregister it, and
    /// either refill the pool or keep draining.
    fn drain(&mut self) -> Result<State> {
        if signals::termination_pending() {
            self.teardown();
        }
        if self.registry.is_empty() {
            return Ok(if self.respawn {
                State::PoolFill
            } else {
                State::End
            });
        }
        match wait() {
            Ok(status) => {
                if let Some(pid) = status.pid() {
                    if self.registry.remove(pid).is_some() {
                        let reason = analyze_wait_status(status);
                        if reason.is_success() {
                            debug!(worker = %pid, live = self.registry.len(), "worker exited");
                        } else {
                            warn!(
                                worker = %pid,
                                %reason,
                                live = self.registry.len(),
                                "worker exited abnormally"
                            );
                        }
                    }
                }
                Ok(if self.respawn {
                    State::PoolFill
                } else if self.registry.is_empty() {
                    State::End
                } else {
                    State::PoolDrain
                })
            }
            // A signal landed while blocked; loop around so a pending
            // termination gets noticed.
            Err(Errno::EINTR) => Ok(State::PoolDrain),
            // No children left despite a non-empty registry: nothing more
            // to supervise.
            Err(Errno::ECHILD) => {
                self.registry.clear();
                Ok(State::End)
            }
            Err(errno) => Err(SupervisorError::Wait(errno)),
        }
    }

    /// Termination teardown: kill every registered worker, remove the pid
    /// file, exit. Runs in the main sequence, not in the signal handler.
    fn teardown(&mut self) -> ! {
        info!(
            pid = %getpid(),
            workers = self.registry.len(),
            "termination signal received, shutting down"
        );
        self.kill_registered();
        if let Some(pid_file) = &self.pid_file {
            let _ = pid_file.remove();
        }
        process::exit(0);
    }

    /// Send SIGKILL to every registered worker and reap it, best-effort. A
    /// worker that already exited is not an error.
    fn kill_registered(&mut self) {
        for pid in self.registry.pids() {
            let _ = kill(pid, Signal::SIGKILL);
            let _ = waitpid(pid, None);
            debug!(worker = %pid, "killed worker");
        }
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let sup = Supervisor::new(|| {});
        assert_eq!(sup.fork_count, 0);
        assert!(!sup.respawn);
        assert!(sup.pid_file.is_none());
        assert_eq!(sup.role, Role::Originator);
        assert!(sup.registry.is_empty());
    }

    #[test]
    fn test_pool_configuration() {
        let sup = Supervisor::new(|| {}).pool(5, true);
        assert_eq!(sup.fork_count, 5);
        assert!(sup.respawn);
    }

    #[test]
    fn test_daemonize_configuration() {
        let sup = Supervisor::new(|| {}).daemonize("/tmp/test.pid");
        let pid_file = sup.pid_file.as_ref().unwrap();
        assert_eq!(pid_file.path(), std::path::Path::new("/tmp/test.pid"));
    }

    #[test]
    fn test_zero_pool_runs_callback_in_place() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let result = Supervisor::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .run();

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_pool_runs_callback_in_calling_process() {
        let caller = std::process::id();
        let seen = Arc::new(AtomicUsize::new(0));
        let observed = seen.clone();

        Supervisor::new(move || {
            observed.store(std::process::id() as usize, Ordering::SeqCst);
        })
        .run()
        .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), caller as usize);
    }
}
