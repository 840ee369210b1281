//! The re-entrant step driver for the lock-based discipline.
//!
//! `run_step` advances an instance through as many states as it can
//! and returns the first outcome that needs the scheduler: committed,
//! waiting on a lock, waiting on a remote node, or aborted. The
//! instance can be handed back to `run_step` any number of times; it
//! always continues from its saved state and cursor.

use crate::cc::Acquire;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::instance::{RowHandle, TransactionInstance};
use crate::metrics::RowCategory;
use crate::states::{NewOrderState, PaymentState, TxnState};
use crate::trackers::LockTracker;
use granary_types::{AccessMode, Query, RowId};
use std::sync::Arc;

/// Why a transaction aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    /// The concurrency gateway refused a row.
    Concurrency,
    /// The query carried the business-level rollback flag.
    Logical,
}

/// What the scheduler should do with the instance next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Terminal state reached; all handles released.
    Committed,
    /// Blocked on a lock; retry later.
    Waiting,
    /// A continuation was shipped; resume when the response arrives.
    RemoteWait,
    /// Aborted; all handles released.
    Aborted(AbortKind),
}

/// Internal verdict of a single state handler.
enum StepResult {
    Next(TxnState),
    Waiting,
    RemoteWait,
    Abort(AbortKind),
    Finished,
}

impl Engine {
    /// Drive an instance until it commits, blocks or aborts.
    #[tracing::instrument(skip_all, fields(txn = txn.id().0))]
    pub fn run_step(&self, txn: &mut TransactionInstance) -> Result<StepOutcome, EngineError> {
        loop {
            let result = match txn.state() {
                TxnState::Payment(state) => self.payment_step(txn, state)?,
                TxnState::NewOrder(state) => self.new_order_step(txn, state)?,
            };
            match result {
                StepResult::Next(next) => txn.set_state(next),
                StepResult::Waiting => return Ok(StepOutcome::Waiting),
                StepResult::RemoteWait => return Ok(StepOutcome::RemoteWait),
                StepResult::Abort(kind) => {
                    self.abort(txn);
                    return Ok(StepOutcome::Aborted(kind));
                }
                StepResult::Finished => {
                    self.finish(txn);
                    return Ok(StepOutcome::Committed);
                }
            }
        }
    }

    fn acquire(
        &self,
        txn: &mut TransactionInstance,
        row: RowId,
        mode: AccessMode,
        category: RowCategory,
    ) -> Option<StepResult> {
        match self.cc.acquire(txn.id(), row, mode) {
            Acquire::Granted => {
                txn.push_handle(RowHandle { row, mode });
                None
            }
            Acquire::Wait => {
                self.metrics.record_wait(category);
                Some(StepResult::Waiting)
            }
            Acquire::Abort => {
                self.metrics.record_abort(category);
                Some(StepResult::Abort(AbortKind::Concurrency))
            }
        }
    }

    fn payment_step(
        &self,
        txn: &mut TransactionInstance,
        state: PaymentState,
    ) -> Result<StepResult, EngineError> {
        let query = txn.query_arc();
        let Query::Payment(query) = query.as_ref() else {
            return Err(EngineError::Invariant("payment step on non-payment query"));
        };

        Ok(match state {
            PaymentState::ReadWarehouse => {
                if !self.is_local(query.w_id) {
                    self.dispatch_segment(txn, self.node_for(query.w_id));
                    return Ok(StepResult::RemoteWait);
                }
                let warehouse = self.warehouse_row(query.w_id)?;
                let mode = if self.config.warehouse_update {
                    AccessMode::Write
                } else {
                    AccessMode::Read
                };
                if let Some(halt) = self.acquire(txn, warehouse, mode, RowCategory::Warehouse) {
                    return Ok(halt);
                }
                StepResult::Next(TxnState::Payment(PaymentState::ApplyWarehouseYtd {
                    warehouse,
                }))
            }
            PaymentState::ApplyWarehouseYtd { warehouse } => {
                if self.config.warehouse_update {
                    self.apply_warehouse_ytd(warehouse, query.h_amount)?;
                }
                StepResult::Next(TxnState::Payment(PaymentState::ReadDistrict))
            }
            PaymentState::ReadDistrict => {
                let district = self.district_row(query.d_id, query.d_w_id)?;
                if let Some(halt) =
                    self.acquire(txn, district, AccessMode::Write, RowCategory::District)
                {
                    return Ok(halt);
                }
                StepResult::Next(TxnState::Payment(PaymentState::ApplyDistrictYtd { district }))
            }
            PaymentState::ApplyDistrictYtd { district } => {
                self.apply_district_ytd(district, query.h_amount)?;
                StepResult::Next(TxnState::Payment(PaymentState::ReadCustomer))
            }
            PaymentState::ReadCustomer => {
                if !self.is_local(query.c_w_id) {
                    self.dispatch_segment(txn, self.node_for(query.c_w_id));
                    return Ok(StepResult::RemoteWait);
                }
                let (customer, category) = if query.by_last_name {
                    let row =
                        self.customer_row_by_name(&query.c_last, query.c_d_id, query.c_w_id)?;
                    (row, RowCategory::CustomerIndex)
                } else {
                    let row = self.customer_row(query.c_id, query.c_d_id, query.c_w_id)?;
                    (row, RowCategory::Customer)
                };
                if let Some(halt) = self.acquire(txn, customer, AccessMode::Write, category) {
                    return Ok(halt);
                }
                StepResult::Next(TxnState::Payment(
                    PaymentState::ApplyCustomerPaymentAndHistory { customer },
                ))
            }
            PaymentState::ApplyCustomerPaymentAndHistory { customer } => {
                self.apply_customer_payment(customer, query)?;
                self.insert_history(query)?;
                StepResult::Next(TxnState::Payment(PaymentState::Done))
            }
            PaymentState::Done => {
                if query.rollback {
                    StepResult::Abort(AbortKind::Logical)
                } else {
                    StepResult::Finished
                }
            }
        })
    }

    fn new_order_step(
        &self,
        txn: &mut TransactionInstance,
        state: NewOrderState,
    ) -> Result<StepResult, EngineError> {
        let query = txn.query_arc();
        let Query::NewOrder(query) = query.as_ref() else {
            return Err(EngineError::Invariant(
                "new-order step on non-new-order query",
            ));
        };

        Ok(match state {
            NewOrderState::ReadWarehouse => {
                if !self.is_local(query.w_id) {
                    self.dispatch_segment(txn, self.node_for(query.w_id));
                    return Ok(StepResult::RemoteWait);
                }
                let warehouse = self.warehouse_row(query.w_id)?;
                if let Some(halt) =
                    self.acquire(txn, warehouse, AccessMode::Read, RowCategory::Warehouse)
                {
                    return Ok(halt);
                }
                StepResult::Next(TxnState::NewOrder(NewOrderState::ReadWarehouseTax {
                    warehouse,
                }))
            }
            NewOrderState::ReadWarehouseTax { warehouse } => {
                // The tax rate feeds the client-side order total, not
                // any row write.
                let _tax = self.warehouse_tax(warehouse)?;
                StepResult::Next(TxnState::NewOrder(NewOrderState::ReadCustomer))
            }
            NewOrderState::ReadCustomer => {
                let customer = self.customer_row(query.c_id, query.d_id, query.w_id)?;
                if let Some(halt) =
                    self.acquire(txn, customer, AccessMode::Read, RowCategory::Customer)
                {
                    return Ok(halt);
                }
                StepResult::Next(TxnState::NewOrder(NewOrderState::ReadCustomerDiscount {
                    customer,
                }))
            }
            NewOrderState::ReadCustomerDiscount { customer } => {
                let _discount = self.customer_discount(customer)?;
                StepResult::Next(TxnState::NewOrder(NewOrderState::ReadAndBumpDistrictOrderId))
            }
            NewOrderState::ReadAndBumpDistrictOrderId => {
                let district = self.district_row(query.d_id, query.w_id)?;
                if let Some(halt) =
                    self.acquire(txn, district, AccessMode::Write, RowCategory::District)
                {
                    return Ok(halt);
                }
                let order_id = self.bump_district_order_id(district)?;
                txn.set_order_id(Some(order_id));
                StepResult::Next(TxnState::NewOrder(NewOrderState::InsertOrderRows))
            }
            NewOrderState::InsertOrderRows => {
                let order_id = txn
                    .order_id()
                    .ok_or(EngineError::Invariant("order id missing at order insert"))?;
                self.insert_order_rows(query, order_id)?;
                if txn.next_item() < query.items.len() {
                    StepResult::Next(TxnState::NewOrder(NewOrderState::ReadItem))
                } else {
                    StepResult::Next(TxnState::NewOrder(NewOrderState::Done))
                }
            }
            NewOrderState::ReadItem => {
                let line = *query
                    .items
                    .get(txn.next_item())
                    .ok_or(EngineError::Invariant("item cursor past the order lines"))?;
                let item = self.item_row(line.item_id)?;
                if let Some(halt) = self.acquire(txn, item, AccessMode::Read, RowCategory::Item) {
                    return Ok(halt);
                }
                StepResult::Next(TxnState::NewOrder(NewOrderState::ReadItemPrice { item }))
            }
            NewOrderState::ReadItemPrice { item } => {
                let _price = self.item_price(item)?;
                StepResult::Next(TxnState::NewOrder(NewOrderState::ReadAndUpdateStock))
            }
            NewOrderState::ReadAndUpdateStock => {
                // Re-entered here after a shipped run completes; the
                // cursor may already be past the end.
                if txn.next_item() >= query.items.len() {
                    return Ok(StepResult::Next(TxnState::NewOrder(NewOrderState::Done)));
                }
                let line = query.items[txn.next_item()];
                if !self.is_local(line.supply_w_id) {
                    self.dispatch_item_run(txn, query);
                    return Ok(StepResult::RemoteWait);
                }
                let stock = self.stock_row(line.item_id, line.supply_w_id)?;
                if let Some(halt) = self.acquire(txn, stock, AccessMode::Write, RowCategory::Stock)
                {
                    return Ok(halt);
                }
                self.apply_stock_update(stock, &line, query.remote)?;
                StepResult::Next(TxnState::NewOrder(NewOrderState::InsertOrderLine))
            }
            NewOrderState::InsertOrderLine => {
                let order_id = txn
                    .order_id()
                    .ok_or(EngineError::Invariant("order id missing at line insert"))?;
                let line = *query
                    .items
                    .get(txn.next_item())
                    .ok_or(EngineError::Invariant("item cursor past the order lines"))?;
                let number = txn.line_base() + txn.next_item() as u64;
                self.insert_order_line(query, &line, number, order_id)?;
                txn.advance_item();
                if txn.next_item() < query.items.len() {
                    StepResult::Next(TxnState::NewOrder(NewOrderState::ReadItem))
                } else {
                    StepResult::Next(TxnState::NewOrder(NewOrderState::Done))
                }
            }
            NewOrderState::Done => {
                if query.rollback {
                    StepResult::Abort(AbortKind::Logical)
                } else {
                    StepResult::Finished
                }
            }
        })
    }

    /// Declare every local lock the transaction will need, queueing
    /// behind conflicting owners. Returns true when every declared
    /// lock was granted immediately and this caller won the readiness
    /// flip; otherwise the instance's [`LockTracker`] reports when the
    /// last queued grant arrives.
    pub fn declare_locks(&self, txn: &TransactionInstance) -> Result<bool, EngineError> {
        let tracker = txn.lock_tracker();
        // Sentinel: holds the count above zero until the whole set is
        // declared, so a concurrent grant cannot flip readiness early.
        tracker.add_pending();

        match txn.query() {
            Query::Payment(query) => {
                if self.is_local(query.w_id) {
                    let mode = if self.config.warehouse_update {
                        AccessMode::Write
                    } else {
                        AccessMode::Read
                    };
                    self.declare(txn, tracker, self.warehouse_row(query.w_id)?, mode);
                    self.declare(
                        txn,
                        tracker,
                        self.district_row(query.d_id, query.d_w_id)?,
                        AccessMode::Write,
                    );
                }
                if self.is_local(query.c_w_id) {
                    let customer = if query.by_last_name {
                        self.customer_row_by_name(&query.c_last, query.c_d_id, query.c_w_id)?
                    } else {
                        self.customer_row(query.c_id, query.c_d_id, query.c_w_id)?
                    };
                    self.declare(txn, tracker, customer, AccessMode::Write);
                }
            }
            Query::NewOrder(query) => {
                if self.is_local(query.w_id) {
                    self.declare(txn, tracker, self.warehouse_row(query.w_id)?, AccessMode::Read);
                    self.declare(
                        txn,
                        tracker,
                        self.customer_row(query.c_id, query.d_id, query.w_id)?,
                        AccessMode::Read,
                    );
                    self.declare(
                        txn,
                        tracker,
                        self.district_row(query.d_id, query.w_id)?,
                        AccessMode::Write,
                    );
                }
                for line in &query.items {
                    if self.is_local(line.supply_w_id) {
                        self.declare(txn, tracker, self.item_row(line.item_id)?, AccessMode::Read);
                        self.declare(
                            txn,
                            tracker,
                            self.stock_row(line.item_id, line.supply_w_id)?,
                            AccessMode::Write,
                        );
                    }
                }
            }
        }

        Ok(tracker.resolve())
    }

    fn declare(
        &self,
        txn: &TransactionInstance,
        tracker: &Arc<LockTracker>,
        row: RowId,
        mode: AccessMode,
    ) {
        // Count before queueing: a grant from a concurrent release
        // must never find the count unregistered.
        tracker.add_pending();
        if self.cc.acquire_deferred(txn.id(), row, mode, tracker) {
            // granted on the spot; the sentinel keeps this from
            // flipping readiness
            let _ = tracker.resolve();
        }
    }
}
