//! Granary's per-transaction execution engine.
//!
//! The engine drives Payment and NewOrder transactions through
//! resumable state machines over a partitioned, multi-node row store.
//! It is deliberately passive and synchronous: the embedding scheduler
//! owns every [`TransactionInstance`] and calls back into the engine
//! whenever an instance has work; the engine never spawns threads,
//! never blocks, and never performs I/O beyond handing messages to the
//! [`MessageQueue`] seam.
//!
//! Two concurrency disciplines are supported over the same step
//! library:
//!
//! - **Lock-based** ([`Engine::run_step`]): rows are acquired through
//!   the [`ConcurrencyControl`] gateway as the state machine reaches
//!   them; conflicts surface as [`StepOutcome::Waiting`] or aborts.
//! - **Deterministic phased** ([`Engine::run_calvin`]): the lock set
//!   is declared up front ([`Engine::declare_locks`]) and execution
//!   proceeds through fixed analyze/read/serve/collect/write phases
//!   with no per-row conflicts.
//!
//! Rows on other nodes are reached by shipping the suspended state:
//! [`Engine::run_step`] returns [`StepOutcome::RemoteWait`] after
//! enqueueing a [`ContinuationMessage`], and the instance resumes when
//! the serving node's [`ContinuationResponse`] is applied.

mod calvin;
mod cc;
mod config;
mod dispatch;
mod engine;
mod error;
mod instance;
mod machine;
mod messages;
mod metrics;
mod states;
mod steps;
pub mod trackers;

pub use calvin::CalvinOutcome;
pub use cc::{Acquire, ConcurrencyControl, LockTable};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use instance::{CalvinPhase, RowHandle, TransactionInstance};
pub use machine::{AbortKind, StepOutcome};
pub use messages::{
    ContinuationKind, ContinuationMessage, ContinuationResponse, MessageQueue, OutboundMessage,
    PhaseReadMessage, RecordingQueue,
};
pub use metrics::{CountingMetrics, Metrics, NoopMetrics, RowCategory};
pub use states::{NewOrderState, PaymentState, TxnState};
