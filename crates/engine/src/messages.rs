//! Outbound messages and the transport seam.
//!
//! The engine never performs I/O; it hands fully-formed messages to a
//! [`MessageQueue`] and the embedding process moves the bytes. Tests
//! and simulations use [`RecordingQueue`] and deliver by hand.

use crate::states::TxnState;
use granary_types::{FieldId, NodeId, OrderId, OrderLineItem, Query, TxnId, Value};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Why a continuation was shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContinuationKind {
    /// A state whose row lives on the destination node; the serving
    /// node runs forward from that state and answers with wherever it
    /// stopped.
    Segment,
    /// A contiguous run of order lines supplied by warehouses the
    /// destination owns; the serving node runs a detached instance
    /// over just those lines.
    ItemRun,
}

/// A suspended transaction shipped to the node owning the rows it
/// needs next. The full query rides along: the serving node recomputes
/// every key from it rather than trusting foreign row ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationMessage {
    pub txn: TxnId,
    pub kind: ContinuationKind,
    pub query: Query,
    /// State to resume at (segment continuations).
    pub state: TxnState,
    /// Order id, once allocated on the home node.
    pub order_id: Option<OrderId>,
    /// Shipped order lines (item runs; empty for segments).
    pub items: Vec<OrderLineItem>,
    /// Global line number of the first shipped order line.
    pub first_line: u64,
}

/// Where a served continuation left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationResponse {
    pub txn: TxnId,
    pub kind: ContinuationKind,
    pub state: TxnState,
    pub next_item: usize,
    pub order_id: Option<OrderId>,
}

/// Read results shipped between deterministic-phase participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReadMessage {
    pub txn: TxnId,
    pub from: NodeId,
    pub values: Vec<(FieldId, Value)>,
}

/// Everything the engine can put on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundMessage {
    Continuation(ContinuationMessage),
    ContinuationResponse(ContinuationResponse),
    PhaseRead(PhaseReadMessage),
    /// The sender finished its deterministic write phase.
    PhaseFinish { txn: TxnId, from: NodeId },
}

impl OutboundMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Continuation(_) => "Continuation",
            OutboundMessage::ContinuationResponse(_) => "ContinuationResponse",
            OutboundMessage::PhaseRead(_) => "PhaseRead",
            OutboundMessage::PhaseFinish { .. } => "PhaseFinish",
        }
    }
}

/// Transport seam. Enqueueing must not block.
pub trait MessageQueue: Send + Sync {
    fn enqueue(&self, message: OutboundMessage, destination: NodeId);
}

/// Records messages instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    sent: Mutex<Vec<(OutboundMessage, NodeId)>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every recorded message, oldest first.
    pub fn drain(&self) -> Vec<(OutboundMessage, NodeId)> {
        std::mem::take(&mut self.sent.lock().unwrap())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl MessageQueue for RecordingQueue {
    fn enqueue(&self, message: OutboundMessage, destination: NodeId) {
        self.sent.lock().unwrap().push((message, destination));
    }
}
