//! Live-child bookkeeping for the pool parent.
//!
//! The registry maps each forked worker's pid to its spawn time. It exists
//! only in the process acting as pool parent and is never read by the
//! workers themselves; after a fork the child's inherited copy is cleared.

use nix::unistd::Pid;
use std::collections::HashMap;
use std::time::Instant;

/// In-memory map of live worker processes, keyed by pid.
///
/// Entries are added when a fork succeeds in the parent branch and removed
/// when a wait reports that pid as exited. The size never exceeds the
/// configured pool target.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    children: HashMap<Pid, Instant>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a freshly forked child, stamped with the current time.
    pub(crate) fn insert(&mut self, pid: Pid) {
        self.children.insert(pid, Instant::now());
    }

    /// Remove a reaped child. Returns its spawn time if it was registered.
    pub(crate) fn remove(&mut self, pid: Pid) -> Option<Instant> {
        self.children.remove(&pid)
    }

    pub(crate) fn len(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Snapshot of the registered pids, for teardown iteration.
    pub(crate) fn pids(&self) -> Vec<Pid> {
        self.children.keys().copied().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.children.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.insert(Pid::from_raw(100));
        registry.insert(Pid::from_raw(200));
        assert_eq!(registry.len(), 2);

        let spawned = registry.remove(Pid::from_raw(100));
        assert!(spawned.is_some());
        assert_eq!(registry.len(), 1);

        // Removing an unknown pid is a no-op.
        assert!(registry.remove(Pid::from_raw(999)).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insert_same_pid_twice_keeps_one_entry() {
        let mut registry = Registry::new();
        registry.insert(Pid::from_raw(100));
        registry.insert(Pid::from_raw(100));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pids_snapshot() {
        let mut registry = Registry::new();
        registry.insert(Pid::from_raw(1));
        registry.insert(Pid::from_raw(2));
        registry.insert(Pid::from_raw(3));

        let mut pids: Vec<i32> = registry.pids().iter().map(|p| p.as_raw()).collect();
        pids.sort();
        assert_eq!(pids, vec![1, 2, 3]);
    }

    #[test]
    fn test_clear() {
        let mut registry = Registry::new();
        registry.insert(Pid::from_raw(1));
        registry.insert(Pid::from_raw(2));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.pids().is_empty());
    }
}
