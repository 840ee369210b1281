//! Per-transaction execution state.

use crate::states::TxnState;
use crate::trackers::{LockTracker, PhaseBarrier};
use granary_types::{AccessMode, FieldId, NodeId, OrderId, Query, RowId, TxnId, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A row acquired through the concurrency gateway. Kept until commit
/// or abort, when every handle is released at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHandle {
    pub row: RowId,
    pub mode: AccessMode,
}

/// Phases of the deterministic discipline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalvinPhase {
    Analyze,
    LocalRead,
    ServeRemoteReads,
    CollectRemoteReads,
    ExecuteWrites,
    Done,
}

/// One in-flight transaction.
///
/// The instance owns everything that survives a suspension: the
/// immutable query, the current state, the item cursor, acquired row
/// handles and the phase bookkeeping of the deterministic discipline.
/// Apart from the lock tracker it is single-threaded; the scheduler
/// hands it to one worker at a time.
pub struct TransactionInstance {
    id: TxnId,
    query: Arc<Query>,
    state: TxnState,
    /// Forward-only cursor into the NewOrder item sequence.
    next_item: usize,
    /// Global line number of item 0; non-zero on detached instances
    /// serving a shipped item run.
    line_base: u64,
    order_id: Option<OrderId>,
    handles: Vec<RowHandle>,
    locks: Arc<LockTracker>,
    phase: CalvinPhase,
    participants: BTreeSet<NodeId>,
    barrier: Option<PhaseBarrier>,
    /// Peer read responses delivered before the analyze phase armed
    /// the barrier; replayed into it when it is.
    early_reads: BTreeSet<NodeId>,
    read_values: Vec<(FieldId, Value)>,
}

impl TransactionInstance {
    pub fn new(id: TxnId, query: Query) -> Self {
        let state = TxnState::start(query.profile());
        Self {
            id,
            query: Arc::new(query),
            state,
            next_item: 0,
            line_base: 0,
            order_id: None,
            handles: Vec::new(),
            locks: Arc::new(LockTracker::new()),
            phase: CalvinPhase::Analyze,
            participants: BTreeSet::new(),
            barrier: None,
            early_reads: BTreeSet::new(),
            read_values: Vec::new(),
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub(crate) fn query_arc(&self) -> Arc<Query> {
        Arc::clone(&self.query)
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TxnState) {
        self.state = state;
    }

    pub fn next_item(&self) -> usize {
        self.next_item
    }

    pub(crate) fn set_next_item(&mut self, next_item: usize) {
        self.next_item = next_item;
    }

    pub(crate) fn advance_item(&mut self) {
        self.next_item += 1;
    }

    pub fn line_base(&self) -> u64 {
        self.line_base
    }

    pub(crate) fn set_line_base(&mut self, line_base: u64) {
        self.line_base = line_base;
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub(crate) fn set_order_id(&mut self, order_id: Option<OrderId>) {
        self.order_id = order_id;
    }

    pub fn handles(&self) -> &[RowHandle] {
        &self.handles
    }

    pub(crate) fn push_handle(&mut self, handle: RowHandle) {
        for held in &mut self.handles {
            if held.row == handle.row {
                if handle.mode == AccessMode::Write {
                    held.mode = AccessMode::Write;
                }
                return;
            }
        }
        self.handles.push(handle);
    }

    pub(crate) fn clear_handles(&mut self) {
        self.handles.clear();
    }

    /// The shared tracker for up-front lock declaration.
    pub fn lock_tracker(&self) -> &Arc<LockTracker> {
        &self.locks
    }

    pub fn phase(&self) -> CalvinPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: CalvinPhase) {
        self.phase = phase;
    }

    pub fn participants(&self) -> &BTreeSet<NodeId> {
        &self.participants
    }

    /// Install the analyzed participant set and arm the read barrier
    /// over the peers, replaying any responses that arrived first.
    pub(crate) fn init_phases(&mut self, participants: BTreeSet<NodeId>, peers: BTreeSet<NodeId>) {
        self.participants = participants;
        let mut barrier = PhaseBarrier::new(peers);
        for from in std::mem::take(&mut self.early_reads) {
            barrier.record(from);
        }
        self.barrier = Some(barrier);
    }

    /// Record one peer's read response. Returns true when all peers
    /// have responded. A response outrunning the local analyze phase
    /// is buffered until the barrier exists.
    pub(crate) fn record_peer_read(&mut self, from: NodeId) -> bool {
        match &mut self.barrier {
            Some(barrier) => barrier.record(from),
            None => {
                self.early_reads.insert(from);
                false
            }
        }
    }

    pub(crate) fn barrier_complete(&self) -> bool {
        self.barrier.as_ref().map_or(false, PhaseBarrier::is_complete)
    }

    pub(crate) fn push_read_value(&mut self, field: FieldId, value: Value) {
        self.read_values.push((field, value));
    }

    pub(crate) fn read_values(&self) -> &[(FieldId, Value)] {
        &self.read_values
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
