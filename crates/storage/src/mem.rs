//! In-memory row store and indexes.
//!
//! Backs the engine's tests and single-process simulations. Rows are
//! flat field maps; indexes are key-to-row-chain maps. Partitions only
//! scope allocation bookkeeping — all partitions of a `MemStore` live
//! in one process.

use crate::{IndexSet, RowStore, StorageError};
use granary_types::{FieldId, IndexId, PartitionId, RowId, TableId, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    /// Field contents per row.
    rows: HashMap<RowId, HashMap<FieldId, Value>>,
    /// Which table each row belongs to, set at allocation.
    tables: HashMap<RowId, (TableId, PartitionId)>,
    /// Rows published via insert, per table (latest first is not
    /// guaranteed; order is insertion order).
    published: HashMap<TableId, Vec<RowId>>,
    /// Index chains.
    index: HashMap<(IndexId, u64), Vec<RowId>>,
    next_row: u64,
}

/// In-memory implementation of [`RowStore`] and [`IndexSet`].
#[derive(Debug, Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one row: allocate it, set its fields, publish it, and add
    /// it to `index` under `key`. Chains grow in call order, so seeding
    /// customers in ascending primary-key order yields an ascending
    /// chain for the last-name index.
    pub fn seed_row(
        &self,
        table: TableId,
        partition: PartitionId,
        index_entries: &[(IndexId, u64)],
        fields: &[(FieldId, Value)],
    ) -> RowId {
        let mut inner = self.inner.lock().expect("MemStore lock poisoned");
        let row = RowId(inner.next_row);
        inner.next_row += 1;
        inner.rows.insert(row, fields.iter().copied().collect());
        inner.tables.insert(row, (table, partition));
        inner.published.entry(table).or_default().push(row);
        for (index, key) in index_entries {
            inner.index.entry((*index, *key)).or_default().push(row);
        }
        row
    }

    /// Snapshot all fields of a row, for test assertions.
    pub fn row_fields(&self, row: RowId) -> Option<HashMap<FieldId, Value>> {
        let inner = self.inner.lock().expect("MemStore lock poisoned");
        inner.rows.get(&row).cloned()
    }

    /// Rows published into a table, in insertion order.
    pub fn published_rows(&self, table: TableId) -> Vec<RowId> {
        let inner = self.inner.lock().expect("MemStore lock poisoned");
        inner.published.get(&table).cloned().unwrap_or_default()
    }
}

impl RowStore for MemStore {
    fn get_field(&self, row: RowId, field: FieldId) -> Result<Value, StorageError> {
        let inner = self.inner.lock().expect("MemStore lock poisoned");
        let fields = inner.rows.get(&row).ok_or(StorageError::UnknownRow(row))?;
        fields
            .get(&field)
            .copied()
            .ok_or(StorageError::MissingField { row, field })
    }

    fn set_field(&self, row: RowId, field: FieldId, value: Value) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("MemStore lock poisoned");
        let fields = inner
            .rows
            .get_mut(&row)
            .ok_or(StorageError::UnknownRow(row))?;
        fields.insert(field, value);
        Ok(())
    }

    fn allocate_row(&self, table: TableId, partition: PartitionId) -> Result<RowId, StorageError> {
        let mut inner = self.inner.lock().expect("MemStore lock poisoned");
        let row = RowId(inner.next_row);
        inner.next_row += 1;
        inner.rows.insert(row, HashMap::new());
        inner.tables.insert(row, (table, partition));
        Ok(row)
    }

    fn insert(&self, row: RowId, table: TableId) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("MemStore lock poisoned");
        if !inner.rows.contains_key(&row) {
            return Err(StorageError::UnknownRow(row));
        }
        inner.published.entry(table).or_default().push(row);
        Ok(())
    }
}

impl IndexSet for MemStore {
    fn lookup(&self, index: IndexId, key: u64, _partition: PartitionId) -> Vec<RowId> {
        let inner = self.inner.lock().expect("MemStore lock poisoned");
        inner
            .index
            .get(&(index, key))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_get_set() {
        let store = MemStore::new();
        let row = store.seed_row(
            TableId::Warehouse,
            PartitionId(0),
            &[(IndexId::Warehouse, 1)],
            &[(FieldId::WYtd, Value::Double(100.0))],
        );
        assert_eq!(
            store.get_field(row, FieldId::WYtd).unwrap(),
            Value::Double(100.0)
        );
        store
            .set_field(row, FieldId::WYtd, Value::Double(250.0))
            .unwrap();
        assert_eq!(
            store.get_field(row, FieldId::WYtd).unwrap(),
            Value::Double(250.0)
        );
        assert_eq!(store.lookup(IndexId::Warehouse, 1, PartitionId(0)), vec![row]);
    }

    #[test]
    fn test_chain_preserves_seed_order() {
        let store = MemStore::new();
        let key = 77;
        let a = store.seed_row(TableId::Customer, PartitionId(0), &[(IndexId::CustomerLastName, key)], &[]);
        let b = store.seed_row(TableId::Customer, PartitionId(0), &[(IndexId::CustomerLastName, key)], &[]);
        let c = store.seed_row(TableId::Customer, PartitionId(0), &[(IndexId::CustomerLastName, key)], &[]);
        assert_eq!(
            store.lookup(IndexId::CustomerLastName, key, PartitionId(0)),
            vec![a, b, c]
        );
    }

    #[test]
    fn test_allocate_then_insert_publishes() {
        let store = MemStore::new();
        let row = store.allocate_row(TableId::History, PartitionId(0)).unwrap();
        assert!(store.published_rows(TableId::History).is_empty());
        store.insert(row, TableId::History).unwrap();
        assert_eq!(store.published_rows(TableId::History), vec![row]);
    }

    #[test]
    fn test_unknown_row_is_an_error() {
        let store = MemStore::new();
        let err = store.get_field(RowId(99), FieldId::WYtd).unwrap_err();
        assert_eq!(err, StorageError::UnknownRow(RowId(99)));
    }
}
