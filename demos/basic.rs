//! One-generation pool: five workers each sleep a moment, report their pid,
//! and exit; the supervisor exits once all five are done.

use forkpool::{logging, Supervisor};
use std::time::Duration;

fn main() -> forkpool::Result<()> {
    logging::init(logging::LogConfig::default().with_env_overrides());

    Supervisor::new(|| {
        let pid = std::process::id();
        std::thread::sleep(Duration::from_secs(1 + u64::from(pid) % 5));
        println!("hello from worker {}", pid);
    })
    .pool(5, false)
    .run()
}
