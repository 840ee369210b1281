//! Per-transaction progress trackers.
//!
//! Trackers accumulate asynchronous events (lock grants, peer read
//! responses) until a transaction can move again. The lock tracker is
//! the only piece of transaction state shared across threads; the
//! phase barrier lives inside the instance and is driven by whichever
//! thread currently owns it.

mod barrier;
mod locks;

pub use barrier::PhaseBarrier;
pub use locks::LockTracker;
