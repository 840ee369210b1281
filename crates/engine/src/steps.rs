//! Business-step primitives shared by both execution disciplines.
//!
//! Each primitive resolves or mutates exactly one logical row. The
//! state machine driver composes them with routing and lock
//! acquisition; the deterministic driver composes them per phase.

use crate::engine::Engine;
use crate::error::EngineError;
use granary_types::{
    customer_key, customer_name_key, district_key, stock_key, CustomerId, DistrictId, FieldId,
    IndexId, ItemId, NewOrderQuery, OrderId, OrderLineItem, PartitionId, PaymentQuery, RowId,
    TableId, Value, WarehouseId,
};

/// Fixed history timestamp stamped by the workload driver.
const HISTORY_DATE: i64 = 2013;

impl Engine {
    fn single_row(
        &self,
        index: IndexId,
        key: u64,
        partition: PartitionId,
    ) -> Result<RowId, EngineError> {
        self.index
            .lookup(index, key, partition)
            .first()
            .copied()
            .ok_or(EngineError::MissingRow { index, key })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Row resolution
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn warehouse_row(&self, w_id: WarehouseId) -> Result<RowId, EngineError> {
        self.single_row(IndexId::Warehouse, w_id.0, self.partition_of(w_id))
    }

    pub(crate) fn district_row(
        &self,
        d_id: DistrictId,
        d_w_id: WarehouseId,
    ) -> Result<RowId, EngineError> {
        self.single_row(
            IndexId::District,
            district_key(d_id, d_w_id),
            self.partition_of(d_w_id),
        )
    }

    pub(crate) fn customer_row(
        &self,
        c_id: CustomerId,
        c_d_id: DistrictId,
        c_w_id: WarehouseId,
    ) -> Result<RowId, EngineError> {
        self.single_row(
            IndexId::CustomerId,
            customer_key(c_id, c_d_id, c_w_id),
            self.partition_of(c_w_id),
        )
    }

    /// Resolve a customer through the last-name secondary index. The
    /// chain holds every customer sharing the name key in insertion
    /// order; the customer at rank n/2 stands in for the median.
    pub(crate) fn customer_row_by_name(
        &self,
        c_last: &str,
        c_d_id: DistrictId,
        c_w_id: WarehouseId,
    ) -> Result<RowId, EngineError> {
        let key = customer_name_key(c_last, c_d_id, c_w_id);
        let chain = self
            .index
            .lookup(IndexId::CustomerLastName, key, self.partition_of(c_w_id));
        chain
            .get(chain.len() / 2)
            .copied()
            .ok_or(EngineError::MissingRow {
                index: IndexId::CustomerLastName,
                key,
            })
    }

    /// The item table is replicated on every node and lives in
    /// partition 0 by convention.
    pub(crate) fn item_row(&self, i_id: ItemId) -> Result<RowId, EngineError> {
        self.single_row(IndexId::Item, i_id.0, PartitionId(0))
    }

    pub(crate) fn stock_row(
        &self,
        i_id: ItemId,
        s_w_id: WarehouseId,
    ) -> Result<RowId, EngineError> {
        self.single_row(
            IndexId::Stock,
            stock_key(i_id, s_w_id),
            self.partition_of(s_w_id),
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn warehouse_tax(&self, warehouse: RowId) -> Result<f64, EngineError> {
        Ok(self.store.get_field(warehouse, FieldId::WTax)?.as_double())
    }

    pub(crate) fn customer_discount(&self, customer: RowId) -> Result<f64, EngineError> {
        Ok(self
            .store
            .get_field(customer, FieldId::CDiscount)?
            .as_double())
    }

    pub(crate) fn item_price(&self, item: RowId) -> Result<f64, EngineError> {
        Ok(self.store.get_field(item, FieldId::IPrice)?.as_double())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Writes and inserts
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn apply_warehouse_ytd(
        &self,
        warehouse: RowId,
        amount: f64,
    ) -> Result<(), EngineError> {
        let ytd = self.store.get_field(warehouse, FieldId::WYtd)?.as_double();
        self.store
            .set_field(warehouse, FieldId::WYtd, Value::from(ytd + amount))?;
        Ok(())
    }

    pub(crate) fn apply_district_ytd(
        &self,
        district: RowId,
        amount: f64,
    ) -> Result<(), EngineError> {
        let ytd = self.store.get_field(district, FieldId::DYtd)?.as_double();
        self.store
            .set_field(district, FieldId::DYtd, Value::from(ytd + amount))?;
        Ok(())
    }

    /// Increment the district's next order id and capture the
    /// incremented value as this order's id.
    pub(crate) fn bump_district_order_id(&self, district: RowId) -> Result<OrderId, EngineError> {
        let order_id = self
            .store
            .get_field(district, FieldId::DNextOrderId)?
            .as_int()
            + 1;
        self.store
            .set_field(district, FieldId::DNextOrderId, Value::from(order_id))?;
        Ok(OrderId(order_id as u64))
    }

    /// Move the payment amount through the customer's balance,
    /// year-to-date total and payment counter.
    pub(crate) fn apply_customer_payment(
        &self,
        customer: RowId,
        query: &PaymentQuery,
    ) -> Result<(), EngineError> {
        let balance = self
            .store
            .get_field(customer, FieldId::CBalance)?
            .as_double();
        self.store.set_field(
            customer,
            FieldId::CBalance,
            Value::from(balance - query.h_amount),
        )?;

        let ytd = self
            .store
            .get_field(customer, FieldId::CYtdPayment)?
            .as_double();
        self.store.set_field(
            customer,
            FieldId::CYtdPayment,
            Value::from(ytd + query.h_amount),
        )?;

        let count = self
            .store
            .get_field(customer, FieldId::CPaymentCnt)?
            .as_int();
        self.store
            .set_field(customer, FieldId::CPaymentCnt, Value::from(count + 1))?;
        Ok(())
    }

    /// Insert the history row next to the customer it belongs to.
    pub(crate) fn insert_history(&self, query: &PaymentQuery) -> Result<(), EngineError> {
        let partition = self.partition_of(query.c_w_id);
        let row = self.store.allocate_row(TableId::History, partition)?;
        self.store
            .set_field(row, FieldId::HCustomerId, Value::from(query.c_id.0))?;
        self.store.set_field(
            row,
            FieldId::HCustomerDistrictId,
            Value::from(query.c_d_id.0),
        )?;
        self.store.set_field(
            row,
            FieldId::HCustomerWarehouseId,
            Value::from(query.c_w_id.0),
        )?;
        self.store
            .set_field(row, FieldId::HDistrictId, Value::from(query.d_id.0))?;
        self.store
            .set_field(row, FieldId::HWarehouseId, Value::from(query.w_id.0))?;
        self.store
            .set_field(row, FieldId::HDate, Value::from(HISTORY_DATE))?;
        self.store
            .set_field(row, FieldId::HAmount, Value::from(query.h_amount))?;
        self.store.insert(row, TableId::History)?;
        Ok(())
    }

    /// Insert the Order row and its NewOrder marker on the home
    /// partition.
    pub(crate) fn insert_order_rows(
        &self,
        query: &NewOrderQuery,
        order_id: OrderId,
    ) -> Result<(), EngineError> {
        let partition = self.partition_of(query.w_id);

        let order = self.store.allocate_row(TableId::Order, partition)?;
        self.store
            .set_field(order, FieldId::OId, Value::from(order_id.0))?;
        self.store
            .set_field(order, FieldId::OCustomerId, Value::from(query.c_id.0))?;
        self.store
            .set_field(order, FieldId::ODistrictId, Value::from(query.d_id.0))?;
        self.store
            .set_field(order, FieldId::OWarehouseId, Value::from(query.w_id.0))?;
        self.store
            .set_field(order, FieldId::OEntryDate, Value::from(query.entry_date))?;
        self.store.set_field(
            order,
            FieldId::OLineCount,
            Value::from(query.line_count() as u64),
        )?;
        let all_local = if query.remote { 0i64 } else { 1i64 };
        self.store
            .set_field(order, FieldId::OAllLocal, Value::from(all_local))?;
        self.store.insert(order, TableId::Order)?;

        let new_order = self.store.allocate_row(TableId::NewOrder, partition)?;
        self.store
            .set_field(new_order, FieldId::NoOrderId, Value::from(order_id.0))?;
        self.store
            .set_field(new_order, FieldId::NoDistrictId, Value::from(query.d_id.0))?;
        self.store
            .set_field(new_order, FieldId::NoWarehouseId, Value::from(query.w_id.0))?;
        self.store.insert(new_order, TableId::NewOrder)?;
        Ok(())
    }

    /// Decrement stock according to the wrap rule and maintain the
    /// stock counters. `remote_order` marks a cross-warehouse order;
    /// every stock row such an order touches counts one remote order,
    /// home-warehouse lines included.
    pub(crate) fn apply_stock_update(
        &self,
        stock: RowId,
        line: &OrderLineItem,
        remote_order: bool,
    ) -> Result<(), EngineError> {
        let quantity = self.store.get_field(stock, FieldId::SQuantity)?.as_int();
        let ordered = line.quantity as i64;
        let updated = if quantity > ordered + 10 {
            quantity - ordered
        } else {
            quantity - ordered + 91
        };
        self.store
            .set_field(stock, FieldId::SQuantity, Value::from(updated))?;

        if self.config.extended_fields {
            let ytd = self.store.get_field(stock, FieldId::SYtd)?.as_int();
            self.store
                .set_field(stock, FieldId::SYtd, Value::from(ytd + ordered))?;
            let orders = self.store.get_field(stock, FieldId::SOrderCnt)?.as_int();
            self.store
                .set_field(stock, FieldId::SOrderCnt, Value::from(orders + 1))?;
        }
        if remote_order {
            let remote = self.store.get_field(stock, FieldId::SRemoteCnt)?.as_int();
            self.store
                .set_field(stock, FieldId::SRemoteCnt, Value::from(remote + 1))?;
        }
        Ok(())
    }

    /// Insert one order line on the partition of its supply warehouse.
    pub(crate) fn insert_order_line(
        &self,
        query: &NewOrderQuery,
        line: &OrderLineItem,
        line_number: u64,
        order_id: OrderId,
    ) -> Result<(), EngineError> {
        let partition = self.partition_of(line.supply_w_id);
        let row = self.store.allocate_row(TableId::OrderLine, partition)?;
        self.store
            .set_field(row, FieldId::OlOrderId, Value::from(order_id.0))?;
        self.store
            .set_field(row, FieldId::OlDistrictId, Value::from(query.d_id.0))?;
        self.store
            .set_field(row, FieldId::OlWarehouseId, Value::from(query.w_id.0))?;
        self.store
            .set_field(row, FieldId::OlNumber, Value::from(line_number))?;
        self.store
            .set_field(row, FieldId::OlItemId, Value::from(line.item_id.0))?;
        if self.config.extended_fields {
            self.store.set_field(
                row,
                FieldId::OlSupplyWarehouseId,
                Value::from(line.supply_w_id.0),
            )?;
            self.store
                .set_field(row, FieldId::OlQuantity, Value::from(line.quantity))?;
            self.store
                .set_field(row, FieldId::OlAmount, Value::from(query.ol_amount))?;
        }
        self.store.insert(row, TableId::OrderLine)?;
        Ok(())
    }
}
