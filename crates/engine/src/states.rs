//! Resumable per-profile state machines.
//!
//! Every state names the next piece of work, not work already done; a
//! transaction suspended in any state can be re-entered later (or on
//! another node) and continue from exactly that state.
//!
//! `Read*` states carry nothing, so a continuation shipped to a remote
//! node serializes without row ids, which are node-local. The state
//! that consumes a resolved row carries its id, putting the
//! read-then-apply handoff into the type.

use granary_types::{Profile, RowId};
use serde::{Deserialize, Serialize};

/// Payment profile states.
///
/// ReadWarehouse and ReadCustomer are the two suspension points: the
/// warehouse and the customer may live on different nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentState {
    ReadWarehouse,
    ApplyWarehouseYtd { warehouse: RowId },
    ReadDistrict,
    ApplyDistrictYtd { district: RowId },
    ReadCustomer,
    ApplyCustomerPaymentAndHistory { customer: RowId },
    Done,
}

/// NewOrder profile states.
///
/// The item loop runs ReadItem through InsertOrderLine once per order
/// line; ReadAndUpdateStock is the suspension point for remote supply
/// warehouses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewOrderState {
    ReadWarehouse,
    ReadWarehouseTax { warehouse: RowId },
    ReadCustomer,
    ReadCustomerDiscount { customer: RowId },
    ReadAndBumpDistrictOrderId,
    InsertOrderRows,
    ReadItem,
    ReadItemPrice { item: RowId },
    ReadAndUpdateStock,
    InsertOrderLine,
    Done,
}

/// The state of a transaction of either profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnState {
    Payment(PaymentState),
    NewOrder(NewOrderState),
}

impl TxnState {
    /// The initial state for a profile.
    pub fn start(profile: Profile) -> Self {
        match profile {
            Profile::Payment => TxnState::Payment(PaymentState::ReadWarehouse),
            Profile::NewOrder => TxnState::NewOrder(NewOrderState::ReadWarehouse),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxnState::Payment(PaymentState::Done) | TxnState::NewOrder(NewOrderState::Done)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_states() {
        assert_eq!(
            TxnState::start(Profile::Payment),
            TxnState::Payment(PaymentState::ReadWarehouse)
        );
        assert!(!TxnState::start(Profile::NewOrder).is_terminal());
        assert!(TxnState::NewOrder(NewOrderState::Done).is_terminal());
    }

    #[test]
    fn test_suspension_states_serialize_without_row_ids() {
        let state = TxnState::NewOrder(NewOrderState::ReadAndUpdateStock);
        let json = serde_json::to_string(&state).unwrap();
        let back: TxnState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
