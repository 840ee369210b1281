//! Transaction profiles and their immutable query payloads.
//!
//! A query is created once when a client submits a transaction and is
//! never mutated afterwards; the execution engine reads routing and
//! parameter data from it at every step and after every resumption.

use crate::{CustomerId, DistrictId, ItemId, WarehouseId};
use serde::{Deserialize, Serialize};

/// The transaction profiles the engine knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    Payment,
    NewOrder,
}

/// One order line of a NewOrder query.
///
/// The item sequence is fixed at query creation; the engine's item
/// cursor only ever moves forward through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub item_id: ItemId,
    pub supply_w_id: WarehouseId,
    pub quantity: u64,
}

/// Parameters of a Payment transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentQuery {
    /// Home warehouse.
    pub w_id: WarehouseId,
    pub d_id: DistrictId,
    /// Warehouse owning the district row (equal to `w_id` in the
    /// standard workload).
    pub d_w_id: WarehouseId,
    pub c_id: CustomerId,
    /// Warehouse owning the customer row; may differ from `w_id` for
    /// remote payments.
    pub c_w_id: WarehouseId,
    pub c_d_id: DistrictId,
    /// Customer last name, used when `by_last_name` is set.
    pub c_last: String,
    /// Payment amount.
    pub h_amount: f64,
    /// Locate the customer through the last-name secondary index
    /// instead of the primary key.
    pub by_last_name: bool,
    /// Business-level rollback: abort at the terminal state.
    pub rollback: bool,
}

/// Parameters of a NewOrder transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderQuery {
    /// Home warehouse.
    pub w_id: WarehouseId,
    pub d_id: DistrictId,
    pub c_id: CustomerId,
    /// Order entry date, carried into the Order row.
    pub entry_date: u64,
    /// Order-line amount, carried into each OrderLine row.
    pub ol_amount: f64,
    /// True iff any item is supplied by a warehouse other than the
    /// home warehouse. Drives the order's all-local flag and the
    /// stock remote-order counter.
    pub remote: bool,
    /// Business-level rollback: abort at the terminal state.
    pub rollback: bool,
    /// The order-line item sequence, fixed at creation.
    pub items: Vec<OrderLineItem>,
}

impl NewOrderQuery {
    /// Build a query, deriving the `remote` flag from the item list.
    pub fn new(
        w_id: WarehouseId,
        d_id: DistrictId,
        c_id: CustomerId,
        entry_date: u64,
        ol_amount: f64,
        rollback: bool,
        items: Vec<OrderLineItem>,
    ) -> Self {
        let remote = items.iter().any(|it| it.supply_w_id != w_id);
        Self {
            w_id,
            d_id,
            c_id,
            entry_date,
            ol_amount,
            remote,
            rollback,
            items,
        }
    }

    /// Number of order lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }
}

/// A submitted transaction: one of the known profiles plus parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Payment(PaymentQuery),
    NewOrder(NewOrderQuery),
}

impl Query {
    pub fn profile(&self) -> Profile {
        match self {
            Query::Payment(_) => Profile::Payment,
            Query::NewOrder(_) => Profile::NewOrder,
        }
    }

    /// The home warehouse, i.e. the partition key of the first routing
    /// decision.
    pub fn home_warehouse(&self) -> WarehouseId {
        match self {
            Query::Payment(q) => q.w_id,
            Query::NewOrder(q) => q.w_id,
        }
    }

    /// The business-level rollback flag, checked at the terminal state.
    pub fn rollback(&self) -> bool {
        match self {
            Query::Payment(q) => q.rollback,
            Query::NewOrder(q) => q.rollback,
        }
    }
}
