//! The engine: collaborators, lifecycle and the resumption API.

use crate::cc::ConcurrencyControl;
use crate::config::EngineConfig;
use crate::instance::TransactionInstance;
use crate::messages::{
    ContinuationKind, ContinuationMessage, ContinuationResponse, MessageQueue, PhaseReadMessage,
};
use crate::metrics::{Metrics, NoopMetrics};
use crate::states::{NewOrderState, TxnState};
use granary_storage::{IndexSet, RowStore};
use granary_types::{NodeId, PartitionId, Query, Topology, WarehouseId};
use std::sync::Arc;

/// The transaction execution engine of one node.
///
/// The engine is passive: the embedding scheduler owns the instances
/// and calls [`run_step`](Engine::run_step) or
/// [`run_calvin`](Engine::run_calvin) whenever an instance has work.
/// All collaborators are shared references, so one engine serves every
/// worker thread of the node.
pub struct Engine {
    pub(crate) topology: Arc<dyn Topology>,
    pub(crate) store: Arc<dyn RowStore>,
    pub(crate) index: Arc<dyn IndexSet>,
    pub(crate) cc: Arc<dyn ConcurrencyControl>,
    pub(crate) queue: Arc<dyn MessageQueue>,
    pub(crate) metrics: Arc<dyn Metrics>,
    pub(crate) config: EngineConfig,
}

impl Engine {
    pub fn new(
        topology: Arc<dyn Topology>,
        store: Arc<dyn RowStore>,
        index: Arc<dyn IndexSet>,
        cc: Arc<dyn ConcurrencyControl>,
        queue: Arc<dyn MessageQueue>,
        config: EngineConfig,
    ) -> Self {
        Self {
            topology,
            store,
            index,
            cc,
            queue,
            metrics: Arc::new(NoopMetrics),
            config,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn local_node(&self) -> NodeId {
        self.topology.local_node()
    }

    pub(crate) fn node_for(&self, w_id: WarehouseId) -> NodeId {
        self.topology.node_for_warehouse(w_id)
    }

    pub(crate) fn is_local(&self, w_id: WarehouseId) -> bool {
        self.topology.is_local_warehouse(w_id)
    }

    pub(crate) fn partition_of(&self, w_id: WarehouseId) -> PartitionId {
        self.topology.partition_for_warehouse(w_id)
    }

    /// Release everything a committed transaction holds.
    pub fn finish(&self, txn: &mut TransactionInstance) {
        self.cc.release_all(txn.id());
        txn.clear_handles();
        tracing::debug!(txn = txn.id().0, "transaction finished");
    }

    /// Release everything an aborting transaction holds. Mutations
    /// already applied stay; there is no undo. A continuation already
    /// shipped is not recalled; the remote side learns of the abort
    /// through the embedding layer's terminal-state propagation.
    pub fn abort(&self, txn: &mut TransactionInstance) {
        self.cc.release_all(txn.id());
        txn.clear_handles();
        tracing::debug!(txn = txn.id().0, state = ?txn.state(), "transaction aborted");
    }

    /// Build the instance that serves a shipped continuation on this
    /// node. Keys are recomputed from the query; no foreign row ids
    /// are trusted.
    pub fn instance_from_continuation(&self, message: ContinuationMessage) -> TransactionInstance {
        let ContinuationMessage {
            txn,
            kind,
            mut query,
            state,
            order_id,
            items,
            first_line,
        } = message;

        let state = match kind {
            ContinuationKind::Segment => state,
            ContinuationKind::ItemRun => {
                // A detached run: only the shipped lines, no terminal
                // rollback (that decision belongs to the home node).
                if let Query::NewOrder(q) = &mut query {
                    q.items = items;
                    q.rollback = false;
                }
                TxnState::NewOrder(NewOrderState::ReadAndUpdateStock)
            }
        };

        let mut instance = TransactionInstance::new(txn, query);
        instance.set_state(state);
        instance.set_order_id(order_id);
        instance.set_line_base(first_line);
        instance
    }

    /// The answer a serving node sends back once a continuation has
    /// run as far as it can here.
    pub fn continuation_response(
        &self,
        txn: &TransactionInstance,
        kind: ContinuationKind,
    ) -> ContinuationResponse {
        ContinuationResponse {
            txn: txn.id(),
            kind,
            state: txn.state(),
            next_item: txn.next_item(),
            order_id: txn.order_id(),
        }
    }

    /// Move a suspended coordinator past the segment a remote node
    /// executed on its behalf. Item-run responses carry no position:
    /// the coordinator's cursor already skipped the shipped lines, so
    /// they only signal that stepping may resume.
    pub fn apply_response(&self, txn: &mut TransactionInstance, response: &ContinuationResponse) {
        match response.kind {
            ContinuationKind::Segment => {
                txn.set_state(response.state);
                txn.set_next_item(response.next_item);
                if txn.order_id().is_none() {
                    txn.set_order_id(response.order_id);
                }
            }
            ContinuationKind::ItemRun => {}
        }
        tracing::debug!(
            txn = txn.id().0,
            kind = ?response.kind,
            state = ?txn.state(),
            "applied continuation response"
        );
    }

    /// Record a peer's deterministic-phase read response; the caller
    /// re-invokes `run_calvin` afterwards.
    pub fn record_phase_read(&self, txn: &mut TransactionInstance, message: &PhaseReadMessage) {
        let complete = txn.record_peer_read(message.from);
        tracing::debug!(
            txn = txn.id().0,
            from = message.from.0,
            complete,
            "recorded phase read response"
        );
    }
}
