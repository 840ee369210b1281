//! Engine error types.

use granary_storage::StorageError;
use granary_types::IndexId;

/// Errors surfaced by the execution engine.
///
/// Contention outcomes (wait, abort) are not errors; they are reported
/// through [`crate::StepOutcome`]. An `EngineError` means the engine or
/// its collaborators are broken and the transaction cannot proceed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An index lookup found no row for a key the workload guarantees
    /// to exist. Fail fast: this is a seeding or routing defect, not a
    /// recoverable condition.
    #[error("no row under key {key} in index {index:?}")]
    MissingRow { index: IndexId, key: u64 },

    /// An internal invariant did not hold.
    #[error("engine invariant violated: {0}")]
    Invariant(&'static str),

    /// The storage engine rejected an operation.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
