//! Partition topology trait and static implementation.
//!
//! The mapping from warehouse to partition to owning node is fixed at
//! startup and read-only afterwards; every routing decision in the
//! engine goes through this trait.

use crate::{NodeId, PartitionId, WarehouseId};
use std::sync::Arc;

/// Routing view of the cluster: which partition a warehouse lives in,
/// and which node owns a partition.
pub trait Topology: Send + Sync {
    /// Map a warehouse id to its partition.
    fn partition_for_warehouse(&self, w_id: WarehouseId) -> PartitionId;

    /// Map a partition to its owning node.
    fn node_for_partition(&self, partition: PartitionId) -> NodeId;

    /// The node this process runs as.
    fn local_node(&self) -> NodeId;

    /// Total number of partitions.
    fn partition_count(&self) -> u64;

    /// Total number of nodes.
    fn node_count(&self) -> u64;

    // Derived methods

    /// Map a warehouse id straight to its owning node.
    fn node_for_warehouse(&self, w_id: WarehouseId) -> NodeId {
        self.node_for_partition(self.partition_for_warehouse(w_id))
    }

    /// Check whether the local node owns a warehouse's partition.
    fn is_local_warehouse(&self, w_id: WarehouseId) -> bool {
        self.node_for_warehouse(w_id) == self.local_node()
    }
}

/// A static topology: warehouses stripe across partitions, partitions
/// stripe across nodes.
#[derive(Debug, Clone)]
pub struct StaticTopology {
    local_node: NodeId,
    partition_count: u64,
    node_count: u64,
}

impl StaticTopology {
    /// Create a topology for `node_count` nodes and `partition_count`
    /// partitions, viewed from `local_node`.
    pub fn new(local_node: NodeId, partition_count: u64, node_count: u64) -> Self {
        assert!(partition_count > 0, "need at least one partition");
        assert!(node_count > 0, "need at least one node");
        Self {
            local_node,
            partition_count,
            node_count,
        }
    }

    /// Single-node, single-partition topology.
    pub fn single_node() -> Self {
        Self::new(NodeId(0), 1, 1)
    }

    /// Create a topology as an Arc for use with trait objects.
    pub fn into_arc(self) -> Arc<dyn Topology> {
        Arc::new(self)
    }
}

impl Topology for StaticTopology {
    fn partition_for_warehouse(&self, w_id: WarehouseId) -> PartitionId {
        PartitionId(w_id.0 % self.partition_count)
    }

    fn node_for_partition(&self, partition: PartitionId) -> NodeId {
        NodeId(partition.0 % self.node_count)
    }

    fn local_node(&self) -> NodeId {
        self.local_node
    }

    fn partition_count(&self) -> u64 {
        self.partition_count
    }

    fn node_count(&self) -> u64 {
        self.node_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_striping() {
        let topo = StaticTopology::new(NodeId(0), 4, 2);
        assert_eq!(topo.partition_for_warehouse(WarehouseId(5)), PartitionId(1));
        assert_eq!(topo.node_for_partition(PartitionId(1)), NodeId(1));
        assert_eq!(topo.node_for_warehouse(WarehouseId(5)), NodeId(1));
        assert!(!topo.is_local_warehouse(WarehouseId(5)));
        assert!(topo.is_local_warehouse(WarehouseId(4)));
    }

    #[test]
    fn test_single_node_owns_everything() {
        let topo = StaticTopology::single_node();
        for w in 0..20 {
            assert!(topo.is_local_warehouse(WarehouseId(w)));
        }
    }
}
