//! Tables, indexes, fields and cell values.
//!
//! The storage engine is an external collaborator; the engine addresses
//! it only through these identifiers and the `Value` cell type.

use serde::{Deserialize, Serialize};

/// The tables touched by the transaction profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableId {
    Warehouse,
    District,
    Customer,
    History,
    Order,
    NewOrder,
    Item,
    Stock,
    OrderLine,
}

/// The index structures the step library reads through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexId {
    Warehouse,
    District,
    /// Customer primary index, keyed by [`crate::customer_key`].
    CustomerId,
    /// Customer secondary index, keyed by [`crate::customer_name_key`].
    /// Lookups return a chain of all customers sharing the key.
    CustomerLastName,
    /// Replicated, unpartitioned item table.
    Item,
    Stock,
}

/// Access mode requested from the concurrency control gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    Read,
    Write,
}

/// Every row field the business steps read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldId {
    // Warehouse
    WYtd,
    WTax,
    // District
    DYtd,
    DNextOrderId,
    // Customer
    CBalance,
    CYtdPayment,
    CPaymentCnt,
    CDiscount,
    // History
    HCustomerId,
    HCustomerDistrictId,
    HCustomerWarehouseId,
    HDistrictId,
    HWarehouseId,
    HDate,
    HAmount,
    // Order
    OId,
    OCustomerId,
    ODistrictId,
    OWarehouseId,
    OEntryDate,
    OLineCount,
    OAllLocal,
    // NewOrder
    NoOrderId,
    NoDistrictId,
    NoWarehouseId,
    // Item
    IPrice,
    // Stock
    SQuantity,
    SYtd,
    SOrderCnt,
    SRemoteCnt,
    // OrderLine
    OlOrderId,
    OlDistrictId,
    OlWarehouseId,
    OlNumber,
    OlItemId,
    OlSupplyWarehouseId,
    OlQuantity,
    OlAmount,
}

/// A single field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Double(f64),
}

impl Value {
    /// Interpret as an integer, truncating a double cell.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            Value::Double(v) => *v as i64,
        }
    }

    /// Interpret as a double.
    pub fn as_double(&self) -> f64 {
        match self {
            Value::Int(v) => *v as f64,
            Value::Double(v) => *v,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(5i64).as_int(), 5);
        assert_eq!(Value::from(2.5f64).as_double(), 2.5);
        assert_eq!(Value::from(7u64).as_double(), 7.0);
    }
}
