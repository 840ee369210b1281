//! Barrier over peer read responses in the deterministic discipline.

use granary_types::NodeId;
use std::collections::BTreeSet;

/// Tracks which participating peers have shipped their read results.
///
/// The local node may not enter its write phase until every other
/// participant's reads have arrived. Duplicate and non-participant
/// responses are ignored.
#[derive(Debug)]
pub struct PhaseBarrier {
    expected: BTreeSet<NodeId>,
    received: BTreeSet<NodeId>,
}

impl PhaseBarrier {
    pub fn new(expected: BTreeSet<NodeId>) -> Self {
        Self {
            expected,
            received: BTreeSet::new(),
        }
    }

    /// Record an arrival. Returns true when the barrier is complete.
    pub fn record(&mut self, from: NodeId) -> bool {
        if !self.expected.contains(&from) {
            tracing::debug!(node = from.0, "read response from non-participant, ignoring");
            return self.is_complete();
        }
        if !self.received.insert(from) {
            tracing::debug!(node = from.0, "duplicate read response, ignoring");
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.received.len() == self.expected.len()
    }

    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    pub fn expected_count(&self) -> usize {
        self.expected.len()
    }
}
