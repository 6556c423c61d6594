use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of [`ShutdownToken::sleep`]; bounds how late a shutdown is noticed.
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Cooperative run flag shared by the signal handler, traversal, the daemon loop and the
/// connectivity supervisor. Nothing is preempted; each holder polls it at its own
/// suspension points.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` or until shutdown is triggered. Returns `true` when the
    /// full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = ShutdownToken::new();
        let other = token.clone();
        assert!(!other.is_triggered());
        token.trigger();
        assert!(other.is_triggered());
    }

    #[test]
    fn test_sleep_returns_early_on_trigger() {
        let token = ShutdownToken::new();
        let trigger = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.trigger();
        });

        let started = Instant::now();
        let completed = token.sleep(Duration::from_secs(30));
        handle.join().unwrap();

        assert!(!completed);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_sleep_completes_without_trigger() {
        let token = ShutdownToken::new();
        assert!(token.sleep(Duration::from_millis(10)));
    }
}
