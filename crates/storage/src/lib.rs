//! Row storage and index contracts for the Granary engine.
//!
//! The physical storage engine is an external collaborator; the
//! execution engine only ever touches rows through [`RowStore`] and
//! finds them through [`IndexSet`]. `MemStore` is the in-memory
//! implementation used by tests and simulations.
//!
//! All operations are synchronous. Implementations use interior
//! mutability so that shared references can be held across the engine,
//! the concurrency-control gateway and the scheduler.

mod mem;

pub use mem::MemStore;

use granary_types::{FieldId, IndexId, PartitionId, RowId, TableId, Value};

/// Error type for storage operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    /// A row id that was never allocated, or was allocated on another
    /// node.
    #[error("unknown row {0:?}")]
    UnknownRow(RowId),
    /// A field the row's table does not carry.
    #[error("row {row:?} has no field {field:?}")]
    MissingField { row: RowId, field: FieldId },
}

/// Per-field access to rows, plus new-row allocation.
pub trait RowStore: Send + Sync {
    /// Read one field of a row.
    fn get_field(&self, row: RowId, field: FieldId) -> Result<Value, StorageError>;

    /// Write one field of a row in place.
    fn set_field(&self, row: RowId, field: FieldId, value: Value) -> Result<(), StorageError>;

    /// Allocate a fresh, empty row in a table partition. The row is not
    /// visible to lookups until [`RowStore::insert`] is called.
    fn allocate_row(&self, table: TableId, partition: PartitionId) -> Result<RowId, StorageError>;

    /// Publish a previously allocated row into its table.
    fn insert(&self, row: RowId, table: TableId) -> Result<(), StorageError>;
}

/// Key lookup through the primary and secondary index structures.
pub trait IndexSet: Send + Sync {
    /// Look up a key, returning the chain of matching rows.
    ///
    /// Primary indexes yield at most one row; the customer last-name
    /// secondary index yields every customer sharing the key, in the
    /// order they were indexed. An empty result means the key is
    /// absent — whether that is an error is the caller's call.
    fn lookup(&self, index: IndexId, key: u64, partition: PartitionId) -> Vec<RowId>;
}
