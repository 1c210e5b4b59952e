//! forkpool - process-level worker supervision.
//!
//! Given a unit of work, a [`Supervisor`] optionally detaches the calling
//! process into a background daemon, then replicates itself into a pool of
//! independent OS worker processes that each execute the callback,
//! optionally respawning workers as they exit, and tearing every worker
//! down when the daemon receives SIGTERM.
//!
//! # Architecture
//!
//! ```text
//!   ┌────────────┐ fork  ┌────────────────┐
//!   │ Originator │──────▶│ Daemon         │  (optional; pid written to
//!   │ (exits)    │       │ = pool parent  │   the pid file, SIGTERM
//!   └────────────┘       └───────┬────────┘   handler installed)
//!                                │
//!                 ┌──────────────┼──────────────┐
//!                 │              │              │
//!           ┌─────▼─────┐  ┌─────▼─────┐  ┌─────▼─────┐
//!           │ Worker 1  │  │ Worker 2  │  │ Worker N  │
//!           │ (process) │  │ (process) │  │ (process) │
//!           │ callback  │  │ callback  │  │ callback  │
//!           └───────────┘  └───────────┘  └───────────┘
//! ```
//!
//! Each worker has its own memory image; the only cross-process coordination
//! is the wait primitive (the pool parent learns of exits), the termination
//! signal, and the pid file.
//!
//! # Example
//!
//! ```no_run
//! use forkpool::Supervisor;
//!
//! Supervisor::new(|| {
//!     println!("hello from worker {}", std::process::id());
//! })
//! .pool(5, true)
//! .daemonize("test.pid")
//! .run()
//! .unwrap();
//! ```

mod error;
pub mod logging;
mod pidfile;
mod registry;
mod signals;
mod supervisor;

pub use error::{Result, SupervisorError};
pub use pidfile::PidFile;
pub use supervisor::{Role, Supervisor};
