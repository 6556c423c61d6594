use dashmap::DashSet;
use std::path::{Path, PathBuf};

/// Deduplicating set of paths waiting to be reconciled.
///
/// Fed by the change notifier thread and drained by the daemon loop. Each shard lock is
/// held for a single insert or remove, never across I/O. Order is not preserved.
#[derive(Debug, Default)]
pub struct WorkQueue {
    pending: DashSet<PathBuf>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when `path` was already queued.
    pub fn push(&self, path: impl Into<PathBuf>) -> bool {
        self.pending.insert(path.into())
    }

    /// Remove and return an arbitrary queued path.
    pub fn pop(&self) -> Option<PathBuf> {
        loop {
            // Clone the key out so no shard guard is alive during `remove`.
            let candidate = self.pending.iter().next().map(|entry| entry.key().clone())?;
            if let Some(path) = self.pending.remove(&candidate) {
                return Some(path);
            }
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.pending.contains(path)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_deduplicates() {
        let queue = WorkQueue::new();
        assert!(queue.push("/music/a.mp3"));
        assert!(!queue.push("/music/a.mp3"));
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(Path::new("/music/a.mp3")));
    }

    #[test]
    fn test_pop_drains_each_path_once() {
        let queue = WorkQueue::new();
        queue.push("/music/a.mp3");
        queue.push("/music/b.mp3");
        queue.push("/music/sub");

        let mut drained = HashSet::new();
        while let Some(path) = queue.pop() {
            assert!(drained.insert(path));
        }
        assert_eq!(drained.len(), 3);
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_concurrent_producers_collapse_duplicates() {
        let queue = Arc::new(WorkQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..50 {
                        queue.push(format!("/music/{}.mp3", i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 50);
    }
}
