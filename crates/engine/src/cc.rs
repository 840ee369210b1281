//! Concurrency control gateway.
//!
//! Every row acquisition in the engine goes through
//! [`ConcurrencyControl`]. The gateway owns no row data; it tracks
//! which transaction holds which row and in what mode, and it queues
//! waiters declared up front so their [`LockTracker`] resolves when
//! the grant eventually happens.

use crate::trackers::LockTracker;
use granary_types::{AccessMode, RowId, TxnId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Outcome of a row acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The row is held; proceed.
    Granted,
    /// A conflicting owner holds the row; retry later. Nothing was
    /// queued.
    Wait,
    /// The gateway runs no-wait and the row conflicts; abort.
    Abort,
}

/// Row-granularity concurrency control.
pub trait ConcurrencyControl: Send + Sync {
    /// Acquire a row for the duration of the transaction.
    fn acquire(&self, txn: TxnId, row: RowId, mode: AccessMode) -> Acquire;

    /// Acquire during up-front declaration. A conflicting request is
    /// queued behind the current owners instead of rejected; the
    /// tracker resolves when the grant happens. Returns true iff the
    /// row was granted immediately.
    fn acquire_deferred(
        &self,
        txn: TxnId,
        row: RowId,
        mode: AccessMode,
        tracker: &Arc<LockTracker>,
    ) -> bool;

    /// Release every row the transaction holds, granting queued
    /// waiters that become compatible.
    fn release_all(&self, txn: TxnId);
}

struct Waiter {
    txn: TxnId,
    mode: AccessMode,
    tracker: Arc<LockTracker>,
}

#[derive(Default)]
struct RowLock {
    owners: Vec<(TxnId, AccessMode)>,
    waiters: VecDeque<Waiter>,
}

impl RowLock {
    /// A request is compatible when every current owner is either the
    /// requesting transaction itself or a fellow reader of a read
    /// request.
    fn compatible(&self, txn: TxnId, mode: AccessMode) -> bool {
        self.owners.iter().all(|(owner, held)| {
            *owner == txn || (*held == AccessMode::Read && mode == AccessMode::Read)
        })
    }

    fn grant(&mut self, txn: TxnId, mode: AccessMode) {
        for (owner, held) in &mut self.owners {
            if *owner == txn {
                if mode == AccessMode::Write {
                    *held = AccessMode::Write;
                }
                return;
            }
        }
        self.owners.push((txn, mode));
    }
}

#[derive(Default)]
struct Inner {
    rows: HashMap<RowId, RowLock>,
    owned: HashMap<TxnId, Vec<RowId>>,
    /// Rows a transaction is queued on, so an abort can pull its
    /// waiter entries back out.
    waiting: HashMap<TxnId, Vec<RowId>>,
}

/// Two-mode lock table: shared reads, exclusive writes.
pub struct LockTable {
    /// Abort conflicting requests instead of reporting a wait.
    no_wait: bool,
    inner: Mutex<Inner>,
}

impl LockTable {
    pub fn new(no_wait: bool) -> Self {
        Self {
            no_wait,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Rows currently held by a transaction (test introspection).
    pub fn held_rows(&self, txn: TxnId) -> Vec<RowId> {
        let inner = self.inner.lock().unwrap();
        inner.owned.get(&txn).cloned().unwrap_or_default()
    }
}

impl Inner {
    fn record_owner(&mut self, txn: TxnId, row: RowId) {
        let rows = self.owned.entry(txn).or_default();
        if !rows.contains(&row) {
            rows.push(row);
        }
    }
}

impl ConcurrencyControl for LockTable {
    fn acquire(&self, txn: TxnId, row: RowId, mode: AccessMode) -> Acquire {
        let mut inner = self.inner.lock().unwrap();
        let lock = inner.rows.entry(row).or_default();
        if lock.compatible(txn, mode) {
            lock.grant(txn, mode);
            inner.record_owner(txn, row);
            Acquire::Granted
        } else if self.no_wait {
            Acquire::Abort
        } else {
            Acquire::Wait
        }
    }

    fn acquire_deferred(
        &self,
        txn: TxnId,
        row: RowId,
        mode: AccessMode,
        tracker: &Arc<LockTracker>,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let lock = inner.rows.entry(row).or_default();
        if lock.compatible(txn, mode) {
            lock.grant(txn, mode);
            inner.record_owner(txn, row);
            true
        } else {
            lock.waiters.push_back(Waiter {
                txn,
                mode,
                tracker: Arc::clone(tracker),
            });
            inner.waiting.entry(txn).or_default().push(row);
            false
        }
    }

    fn release_all(&self, txn: TxnId) {
        let mut inner = self.inner.lock().unwrap();

        // Pull any still-queued declarations, so a row freed later is
        // never granted to this (now finished or aborted) transaction.
        let queued = inner.waiting.remove(&txn).unwrap_or_default();
        for row in queued {
            let empty = match inner.rows.get_mut(&row) {
                Some(lock) => {
                    lock.waiters.retain(|waiter| waiter.txn != txn);
                    lock.owners.is_empty() && lock.waiters.is_empty()
                }
                None => false,
            };
            if empty {
                inner.rows.remove(&row);
            }
        }

        let rows = inner.owned.remove(&txn).unwrap_or_default();
        for row in rows {
            let mut granted = Vec::new();
            let mut drop_entry = false;
            if let Some(lock) = inner.rows.get_mut(&row) {
                lock.owners.retain(|(owner, _)| *owner != txn);

                // Grant queued waiters in order until the first one
                // that still conflicts.
                while lock
                    .waiters
                    .front()
                    .map_or(false, |w| lock.compatible(w.txn, w.mode))
                {
                    let Some(waiter) = lock.waiters.pop_front() else {
                        break;
                    };
                    lock.grant(waiter.txn, waiter.mode);
                    if waiter.tracker.resolve() {
                        tracing::debug!(txn = waiter.txn.0, row = row.0, "lock set complete");
                    }
                    granted.push(waiter.txn);
                }
                drop_entry = lock.owners.is_empty() && lock.waiters.is_empty();
            }
            for waiter_txn in granted {
                inner.record_owner(waiter_txn, row);
                if let Some(queued) = inner.waiting.get_mut(&waiter_txn) {
                    queued.retain(|r| *r != row);
                }
            }
            if drop_entry {
                inner.rows.remove(&row);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_reads_exclusive_writes() {
        let table = LockTable::new(false);
        let row = RowId(7);
        assert_eq!(table.acquire(TxnId(1), row, AccessMode::Read), Acquire::Granted);
        assert_eq!(table.acquire(TxnId(2), row, AccessMode::Read), Acquire::Granted);
        assert_eq!(table.acquire(TxnId(3), row, AccessMode::Write), Acquire::Wait);
    }

    #[test]
    fn test_no_wait_aborts_on_conflict() {
        let table = LockTable::new(true);
        let row = RowId(7);
        assert_eq!(table.acquire(TxnId(1), row, AccessMode::Write), Acquire::Granted);
        assert_eq!(table.acquire(TxnId(2), row, AccessMode::Read), Acquire::Abort);
    }

    #[test]
    fn test_same_transaction_reacquires_and_upgrades() {
        let table = LockTable::new(true);
        let row = RowId(7);
        assert_eq!(table.acquire(TxnId(1), row, AccessMode::Read), Acquire::Granted);
        assert_eq!(table.acquire(TxnId(1), row, AccessMode::Write), Acquire::Granted);
        // still exclusive after the upgrade
        assert_eq!(table.acquire(TxnId(2), row, AccessMode::Read), Acquire::Abort);
    }

    #[test]
    fn test_release_grants_queued_waiter_and_resolves_tracker() {
        let table = LockTable::new(false);
        let row = RowId(7);
        assert_eq!(table.acquire(TxnId(1), row, AccessMode::Write), Acquire::Granted);

        let tracker = Arc::new(LockTracker::new());
        tracker.add_pending();
        assert!(!table.acquire_deferred(TxnId(2), row, AccessMode::Write, &tracker));
        assert!(!tracker.is_ready());

        table.release_all(TxnId(1));
        assert!(tracker.is_ready());
        assert_eq!(table.held_rows(TxnId(2)), vec![row]);
        assert!(table.held_rows(TxnId(1)).is_empty());
    }

    #[test]
    fn test_release_stops_granting_at_first_conflict() {
        let table = LockTable::new(false);
        let row = RowId(7);
        assert_eq!(table.acquire(TxnId(1), row, AccessMode::Write), Acquire::Granted);

        let reader = Arc::new(LockTracker::new());
        reader.add_pending();
        let writer = Arc::new(LockTracker::new());
        writer.add_pending();
        assert!(!table.acquire_deferred(TxnId(2), row, AccessMode::Read, &reader));
        assert!(!table.acquire_deferred(TxnId(3), row, AccessMode::Write, &writer));

        table.release_all(TxnId(1));
        assert!(reader.is_ready());
        assert!(!writer.is_ready());

        table.release_all(TxnId(2));
        assert!(writer.is_ready());
    }

    #[test]
    fn test_release_sweeps_a_departed_waiter() {
        let table = LockTable::new(false);
        let row = RowId(7);
        assert_eq!(table.acquire(TxnId(1), row, AccessMode::Write), Acquire::Granted);

        let tracker = Arc::new(LockTracker::new());
        tracker.add_pending();
        assert!(!table.acquire_deferred(TxnId(2), row, AccessMode::Write, &tracker));

        // txn 2 aborts while still queued; its waiter entry must not
        // receive the row once txn 1 releases it
        table.release_all(TxnId(2));
        table.release_all(TxnId(1));
        assert!(!tracker.is_ready());
        assert!(table.held_rows(TxnId(2)).is_empty());
        assert_eq!(table.acquire(TxnId(3), row, AccessMode::Write), Acquire::Granted);
    }
}
