//! Demand request orchestrator.
//!
//! Runs two chained demand fetches with bounded retry:
//! - **Stage one**: the configured request, retried on failure up to the budget
//! - **Stage two**: the same request widened by the escalation size
//!
//! Callers wait for the run through a [`CompletionGate`], which is signaled
//! exactly once with the final [`RunReport`] whether the run succeeded or failed.

mod config;
mod gate;
mod policy;
mod runner;
mod tracker;
mod types;

pub use config::OrchestratorConfig;
pub use gate::{CompletionGate, GateError};
pub use policy::{should_retry, RetryPolicy, DEFAULT_RETRY_BUDGET};
pub use runner::{DemandRequestOrchestrator, RunHandle, RunUpdateCallback};
pub use tracker::StageTransactionTracker;
pub use types::{OrchestratorError, RunReport, RunState, Stage, StageReport};
