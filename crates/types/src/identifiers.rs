//! Identifier newtypes.
//!
//! Every id is a `u64` newtype so that a warehouse id can never be
//! passed where a district id is expected. All of them are cheap to
//! copy and have deterministic ordering for use in BTree collections.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// A warehouse id; the partition key of the dataset.
    WarehouseId
);
id_type!(
    /// A district id, unique within its warehouse.
    DistrictId
);
id_type!(
    /// A customer id, unique within its district.
    CustomerId
);
id_type!(
    /// An item id into the replicated, unpartitioned item table.
    ItemId
);
id_type!(
    /// An order id, allocated from a district's next-order-id counter.
    OrderId
);
id_type!(
    /// A partition of the dataset; a deterministic function of a
    /// warehouse id.
    PartitionId
);
id_type!(
    /// A process/machine owning one or more partitions.
    NodeId
);
id_type!(
    /// A storage-local row handle. Row ids are meaningful only on the
    /// node that allocated them and never cross the wire.
    RowId
);
id_type!(
    /// A transaction instance id, unique per in-flight execution.
    TxnId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types() {
        // Compile-time property really; sanity-check ordering and display.
        let a = WarehouseId(3);
        let b = WarehouseId(7);
        assert!(a < b);
        assert_eq!(format!("{a}"), "3");
    }
}
