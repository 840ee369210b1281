//! Engine configuration.

/// Static engine configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether Payment updates the warehouse year-to-date total. When
    /// set, the warehouse row is acquired for writing; otherwise a
    /// shared read suffices and the home warehouse stops being a
    /// write hotspot.
    pub warehouse_update: bool,

    /// Whether the auxiliary columns are maintained: the stock
    /// year-to-date and order-count counters, and the order-line
    /// supply-warehouse/quantity/amount columns. Identifying columns,
    /// history fields and order header fields are always written.
    pub extended_fields: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            warehouse_update: true,
            extended_fields: true,
        }
    }
}
