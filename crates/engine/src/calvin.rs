//! The deterministic phased driver.
//!
//! Under the deterministic discipline every participant runs the same
//! transaction through six fixed phases: analyze the participant set,
//! perform local reads, ship read results to peers, wait for every
//! peer's reads, execute local writes, finish. Locks were declared up
//! front (see [`Engine::declare_locks`](crate::Engine::declare_locks)),
//! so no per-row acquisition happens inside the phases.

use crate::engine::Engine;
use crate::error::EngineError;
use crate::instance::{CalvinPhase, TransactionInstance};
use crate::machine::AbortKind;
use crate::messages::{OutboundMessage, PhaseReadMessage};
use granary_types::{FieldId, NodeId, OrderId, Query, Value};
use std::collections::BTreeSet;

/// What the scheduler should do with a deterministic instance next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalvinOutcome {
    /// Terminal phase reached; all locks released.
    Committed,
    /// Waiting on peer read responses.
    Waiting,
    /// The query carried the business-level rollback flag.
    Aborted(AbortKind),
}

impl Engine {
    /// Drive a deterministic instance until it commits or blocks on
    /// the read barrier.
    #[tracing::instrument(skip_all, fields(txn = txn.id().0))]
    pub fn run_calvin(&self, txn: &mut TransactionInstance) -> Result<CalvinOutcome, EngineError> {
        loop {
            match txn.phase() {
                CalvinPhase::Analyze => {
                    let participants = self.participants(txn.query());
                    let local = self.local_node();
                    let peers: BTreeSet<NodeId> = participants
                        .iter()
                        .copied()
                        .filter(|node| *node != local)
                        .collect();
                    tracing::debug!(participants = participants.len(), "analyzed");
                    txn.init_phases(participants, peers);
                    txn.set_phase(CalvinPhase::LocalRead);
                }
                CalvinPhase::LocalRead => {
                    self.calvin_local_reads(txn)?;
                    txn.set_phase(CalvinPhase::ServeRemoteReads);
                }
                CalvinPhase::ServeRemoteReads => {
                    let local = self.local_node();
                    self.calvin_serve_reads(txn);
                    if txn.participants().contains(&local) {
                        txn.set_phase(CalvinPhase::CollectRemoteReads);
                        if !txn.barrier_complete() {
                            return Ok(CalvinOutcome::Waiting);
                        }
                    } else {
                        // Nothing to write here; skip straight to the
                        // terminal phase.
                        txn.set_phase(CalvinPhase::Done);
                    }
                }
                CalvinPhase::CollectRemoteReads => {
                    if !txn.barrier_complete() {
                        return Ok(CalvinOutcome::Waiting);
                    }
                    txn.set_phase(CalvinPhase::ExecuteWrites);
                }
                CalvinPhase::ExecuteWrites => {
                    self.calvin_execute_writes(txn)?;
                    let local = self.local_node();
                    for peer in txn.participants().iter().copied().filter(|n| *n != local) {
                        self.queue.enqueue(
                            OutboundMessage::PhaseFinish {
                                txn: txn.id(),
                                from: local,
                            },
                            peer,
                        );
                    }
                    txn.set_phase(CalvinPhase::Done);
                }
                CalvinPhase::Done => {
                    if txn.query().rollback() {
                        self.abort(txn);
                        return Ok(CalvinOutcome::Aborted(AbortKind::Logical));
                    }
                    self.finish(txn);
                    return Ok(CalvinOutcome::Committed);
                }
            }
        }
    }

    /// Every node whose partitions the transaction touches.
    fn participants(&self, query: &Query) -> BTreeSet<NodeId> {
        let mut nodes = BTreeSet::new();
        match query {
            Query::Payment(q) => {
                nodes.insert(self.node_for(q.w_id));
                nodes.insert(self.node_for(q.c_w_id));
            }
            Query::NewOrder(q) => {
                nodes.insert(self.node_for(q.w_id));
                for line in &q.items {
                    nodes.insert(self.node_for(line.supply_w_id));
                }
            }
        }
        nodes
    }

    /// Phase 2: reads against local rows. Payment has no read phase;
    /// its writes carry their own read-modify-write cycles.
    fn calvin_local_reads(&self, txn: &mut TransactionInstance) -> Result<(), EngineError> {
        let query = txn.query_arc();
        if let Query::NewOrder(q) = query.as_ref() {
            if self.is_local(q.w_id) {
                let tax = self.warehouse_tax(self.warehouse_row(q.w_id)?)?;
                txn.push_read_value(FieldId::WTax, Value::from(tax));
                let discount =
                    self.customer_discount(self.customer_row(q.c_id, q.d_id, q.w_id)?)?;
                txn.push_read_value(FieldId::CDiscount, Value::from(discount));
            }
            for line in &q.items {
                if self.is_local(line.supply_w_id) {
                    let price = self.item_price(self.item_row(line.item_id)?)?;
                    txn.push_read_value(FieldId::IPrice, Value::from(price));
                }
            }
        }
        Ok(())
    }

    /// Phase 3: ship the local read results to every other
    /// participant. Single-participant transactions ship nothing.
    fn calvin_serve_reads(&self, txn: &TransactionInstance) {
        let local = self.local_node();
        if txn.participants().len() <= 1 || !txn.participants().contains(&local) {
            return;
        }
        let message = PhaseReadMessage {
            txn: txn.id(),
            from: local,
            values: txn.read_values().to_vec(),
        };
        for peer in txn.participants().iter().copied().filter(|n| *n != local) {
            self.queue
                .enqueue(OutboundMessage::PhaseRead(message.clone()), peer);
        }
    }

    /// Phase 5: writes against local rows.
    fn calvin_execute_writes(&self, txn: &mut TransactionInstance) -> Result<(), EngineError> {
        let query = txn.query_arc();
        match query.as_ref() {
            Query::Payment(q) => {
                if self.is_local(q.w_id) {
                    if self.config.warehouse_update {
                        self.apply_warehouse_ytd(self.warehouse_row(q.w_id)?, q.h_amount)?;
                    }
                    self.apply_district_ytd(self.district_row(q.d_id, q.d_w_id)?, q.h_amount)?;
                }
                if self.is_local(q.c_w_id) {
                    let customer = if q.by_last_name {
                        self.customer_row_by_name(&q.c_last, q.c_d_id, q.c_w_id)?
                    } else {
                        self.customer_row(q.c_id, q.c_d_id, q.c_w_id)?
                    };
                    self.apply_customer_payment(customer, q)?;
                    self.insert_history(q)?;
                }
            }
            Query::NewOrder(q) => {
                if self.is_local(q.w_id) {
                    let order_id =
                        self.bump_district_order_id(self.district_row(q.d_id, q.w_id)?)?;
                    txn.set_order_id(Some(order_id));
                    self.insert_order_rows(q, order_id)?;
                }
                // The order id is allocated on the home node during
                // this phase; other participants stamp their order
                // lines with the placeholder.
                let order_id = txn.order_id().unwrap_or(OrderId(0));
                for (number, line) in q.items.iter().enumerate() {
                    if self.is_local(line.supply_w_id) {
                        let stock = self.stock_row(line.item_id, line.supply_w_id)?;
                        self.apply_stock_update(stock, line, q.remote)?;
                        self.insert_order_line(q, line, number as u64, order_id)?;
                    }
                }
            }
        }
        Ok(())
    }
}
