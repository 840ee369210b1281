//! Core types for the Granary execution engine.
//!
//! This crate provides the foundational types used throughout the
//! engine:
//!
//! - **Identifiers**: warehouse/district/customer/item ids, partition
//!   and node ids, transaction ids
//! - **Keys**: deterministic index-key construction for every table
//! - **Queries**: the Payment and NewOrder transaction profiles and
//!   their immutable parameter payloads
//! - **Topology**: the partition-to-node routing trait
//! - **Cells**: table/field identifiers and field values
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not
//! depend on any other workspace crates, making it the foundation layer.

mod cell;
mod identifiers;
mod keys;
mod query;
mod topology;

pub use cell::{AccessMode, FieldId, IndexId, TableId, Value};
pub use identifiers::{
    CustomerId, DistrictId, ItemId, NodeId, OrderId, PartitionId, RowId, TxnId, WarehouseId,
};
pub use keys::{
    customer_key, customer_name_key, district_key, stock_key, CUSTOMERS_PER_DISTRICT,
    DISTRICTS_PER_WAREHOUSE, MAX_ITEMS,
};
pub use query::{NewOrderQuery, OrderLineItem, PaymentQuery, Profile, Query};
pub use topology::{StaticTopology, Topology};

/// Test utilities.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;

    /// Create a minimal Payment query against warehouse `w`, district 1,
    /// customer 1, all local, searched by customer id.
    pub fn test_payment(w: u64, amount: f64) -> PaymentQuery {
        PaymentQuery {
            w_id: WarehouseId(w),
            d_id: DistrictId(1),
            d_w_id: WarehouseId(w),
            c_id: CustomerId(1),
            c_w_id: WarehouseId(w),
            c_d_id: DistrictId(1),
            c_last: String::new(),
            h_amount: amount,
            by_last_name: false,
            rollback: false,
        }
    }

    /// Create a NewOrder query with the given supply warehouses, one
    /// order line of quantity 5 per supply warehouse.
    pub fn test_new_order(w: u64, supply: &[u64]) -> NewOrderQuery {
        let items = supply
            .iter()
            .enumerate()
            .map(|(i, s)| OrderLineItem {
                item_id: ItemId(i as u64 + 1),
                supply_w_id: WarehouseId(*s),
                quantity: 5,
            })
            .collect();
        NewOrderQuery::new(
            WarehouseId(w),
            DistrictId(1),
            CustomerId(1),
            2013,
            1.0,
            false,
            items,
        )
    }
}
