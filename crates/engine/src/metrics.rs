//! Contention metrics hooks.
//!
//! The engine reports which row category a transaction blocked or
//! aborted on; the embedding process decides what to do with the
//! counts. `NoopMetrics` is the default sink, `CountingMetrics` backs
//! the tests and simulations.

use std::collections::HashMap;
use std::sync::Mutex;

/// The row categories contention is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowCategory {
    Warehouse,
    District,
    /// Customer row reached through the primary index.
    Customer,
    /// Customer row reached through the last-name secondary index.
    CustomerIndex,
    Item,
    Stock,
}

/// Sink for contention events.
pub trait Metrics: Send + Sync {
    /// A transaction must wait for a row in this category.
    fn record_wait(&self, category: RowCategory) {
        let _ = category;
    }

    /// A transaction aborted on a row in this category.
    fn record_abort(&self, category: RowCategory) {
        let _ = category;
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {}

/// Counts events per category.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    waits: Mutex<HashMap<RowCategory, u64>>,
    aborts: Mutex<HashMap<RowCategory, u64>>,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self, category: RowCategory) -> u64 {
        *self.waits.lock().unwrap().get(&category).unwrap_or(&0)
    }

    pub fn aborts(&self, category: RowCategory) -> u64 {
        *self.aborts.lock().unwrap().get(&category).unwrap_or(&0)
    }
}

impl Metrics for CountingMetrics {
    fn record_wait(&self, category: RowCategory) {
        *self.waits.lock().unwrap().entry(category).or_insert(0) += 1;
    }

    fn record_abort(&self, category: RowCategory) {
        *self.aborts.lock().unwrap().entry(category).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_metrics_accumulate_per_category() {
        let metrics = CountingMetrics::new();
        metrics.record_wait(RowCategory::Stock);
        metrics.record_wait(RowCategory::Stock);
        metrics.record_abort(RowCategory::Customer);
        assert_eq!(metrics.waits(RowCategory::Stock), 2);
        assert_eq!(metrics.waits(RowCategory::Customer), 0);
        assert_eq!(metrics.aborts(RowCategory::Customer), 1);
    }
}
