//! Continuation dispatch to remote nodes.

use crate::engine::Engine;
use crate::instance::TransactionInstance;
use crate::messages::{ContinuationKind, ContinuationMessage, OutboundMessage};
use granary_types::{NewOrderQuery, NodeId};

impl Engine {
    /// Ship the suspended state to the node owning the row the next
    /// state needs. The instance stays where it is; the serving node
    /// answers with the position its segment reached.
    pub(crate) fn dispatch_segment(&self, txn: &TransactionInstance, destination: NodeId) {
        let message = ContinuationMessage {
            txn: txn.id(),
            kind: ContinuationKind::Segment,
            query: txn.query().clone(),
            state: txn.state(),
            order_id: txn.order_id(),
            items: Vec::new(),
            first_line: txn.line_base() + txn.next_item() as u64,
        };
        tracing::debug!(
            txn = txn.id().0,
            destination = destination.0,
            state = ?message.state,
            "dispatching segment continuation"
        );
        self.queue
            .enqueue(OutboundMessage::Continuation(message), destination);
    }

    /// Ship the contiguous run of order lines owned by one remote
    /// node, advancing the item cursor past the whole run. Lines for
    /// the same destination are coalesced into a single message; the
    /// run stops at the first line owned by anyone else.
    pub(crate) fn dispatch_item_run(&self, txn: &mut TransactionInstance, query: &NewOrderQuery) {
        let first = txn.next_item();
        let destination = self.node_for(query.items[first].supply_w_id);
        let mut run = Vec::new();
        while let Some(line) = query.items.get(txn.next_item()) {
            if self.node_for(line.supply_w_id) != destination {
                break;
            }
            run.push(*line);
            txn.advance_item();
        }

        let message = ContinuationMessage {
            txn: txn.id(),
            kind: ContinuationKind::ItemRun,
            query: txn.query().clone(),
            state: txn.state(),
            order_id: txn.order_id(),
            first_line: txn.line_base() + first as u64,
            items: run,
        };
        tracing::debug!(
            txn = txn.id().0,
            destination = destination.0,
            lines = message.items.len(),
            first_line = message.first_line,
            "dispatching order-line run"
        );
        self.queue
            .enqueue(OutboundMessage::Continuation(message), destination);
    }
}
