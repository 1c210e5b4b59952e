//! Daemonized respawning pool.
//!
//! Detaches into the background, keeps two workers alive indefinitely, and
//! logs to a file since stderr is lost after detaching. Stop it with:
//!
//! ```text
//! kill -TERM $(cat /tmp/forkpool-demo.pid)
//! ```

use forkpool::{logging, Supervisor};
use std::time::Duration;

fn main() -> forkpool::Result<()> {
    logging::init(
        logging::LogConfig::default()
            .with_file(std::env::temp_dir().join("forkpool-demo.log"))
            .with_env_overrides(),
    );

    Supervisor::new(|| {
        println!("worker {} doing one round of work", std::process::id());
        std::thread::sleep(Duration::from_secs(5));
    })
    .pool(2, true)
    .daemonize(std::env::temp_dir().join("forkpool-demo.pid"))
    .run()
}
