//! Outstanding-lock tracker for up-front lock declaration.
//!
//! A transaction declaring its lock set counts every request that was
//! queued rather than granted. Grants arrive from whichever thread
//! releases the conflicting owner, so the count and the readiness flag
//! are atomics. The readiness transition is once-only: of all threads
//! resolving counts concurrently, exactly one observes the flip and
//! gets to schedule the transaction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct LockTracker {
    /// Declared requests not yet granted, plus one sentinel held by
    /// the declaring thread until the declaration pass completes.
    outstanding: AtomicU64,
    /// Set exactly once, when the count first reaches zero.
    ready: AtomicBool,
}

impl LockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one outstanding count.
    pub fn add_pending(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    /// Resolve one outstanding count. Returns true iff this call took
    /// the count to zero and won the once-only readiness transition.
    pub fn resolve(&self) -> bool {
        let prev = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "resolve without a matching add_pending");
        if prev == 1 {
            self.ready
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        } else {
            false
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Clear the tracker for a fresh declaration pass.
    pub fn reset(&self) {
        self.outstanding.store(0, Ordering::Release);
        self.ready.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_resolve_counts_down_and_flips_once() {
        let tracker = LockTracker::new();
        tracker.add_pending();
        tracker.add_pending();
        assert!(!tracker.resolve());
        assert!(!tracker.is_ready());
        assert!(tracker.resolve());
        assert!(tracker.is_ready());
    }

    #[test]
    fn test_reset_allows_a_second_pass() {
        let tracker = LockTracker::new();
        tracker.add_pending();
        assert!(tracker.resolve());
        tracker.reset();
        tracker.add_pending();
        assert!(tracker.resolve());
    }

    #[test]
    fn test_exactly_one_racing_thread_observes_the_flip() {
        let threads = 8;
        let tracker = Arc::new(LockTracker::new());
        for _ in 0..threads {
            tracker.add_pending();
        }

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || tracker.resolve())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(tracker.is_ready());
        assert_eq!(tracker.outstanding(), 0);
    }
}
