//! Types for the demand request orchestrator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::request::{AdSize, RequestPayload};

/// One of the chained demand-fetch transactions of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    One,
    Two,
    Done,
}

impl Stage {
    /// The stage that follows this one. `Done` is final.
    pub fn next(self) -> Self {
        match self {
            Stage::One => Stage::Two,
            Stage::Two | Stage::Done => Stage::Done,
        }
    }

    /// Label used for metrics.
    pub fn label(self) -> &'static str {
        match self {
            Stage::One => "stage_one",
            Stage::Two => "stage_two",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::One => write!(f, "stage one"),
            Stage::Two => write!(f, "stage two"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// State of an orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    StageOnePending,
    StageOneRetrying,
    StageTwoPending,
    StageTwoRetrying,
    Succeeded,
    Failed,
}

impl RunState {
    /// First attempt of `stage` in flight.
    pub fn pending(stage: Stage) -> Self {
        match stage {
            Stage::One => RunState::StageOnePending,
            Stage::Two => RunState::StageTwoPending,
            Stage::Done => RunState::Succeeded,
        }
    }

    /// A retry of `stage` in flight.
    pub fn retrying(stage: Stage) -> Self {
        match stage {
            Stage::One => RunState::StageOneRetrying,
            Stage::Two => RunState::StageTwoRetrying,
            Stage::Done => RunState::Succeeded,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::StageOnePending => "stage_one_pending",
            RunState::StageOneRetrying => "stage_one_retrying",
            RunState::StageTwoPending => "stage_two_pending",
            RunState::StageTwoRetrying => "stage_two_retrying",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that terminate an orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum OrchestratorError {
    /// A stage failed on every attempt its budget allows.
    #[error("{stage} exhausted its retry budget after {attempts} attempts")]
    BudgetExhausted { stage: Stage, attempts: u32 },

    /// A completion arrived that the run has no place for.
    #[error("unexpected orchestrator state: {0}")]
    InconsistentState(String),
}

impl OrchestratorError {
    /// The stage the error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            OrchestratorError::BudgetExhausted { stage, .. } => Some(*stage),
            OrchestratorError::InconsistentState(_) => None,
        }
    }
}

/// Per-stage summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Demand fetches issued for the stage.
    pub calls: u32,
    /// Creative size the host view was resized to when the stage succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_size: Option<AdSize>,
}

/// Final record of an orchestration run, delivered through the completion gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Terminal state: `Succeeded` or `Failed`.
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stage_one: StageReport,
    pub stage_two: StageReport,
    /// The request payload as last sent.
    pub payload: RequestPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OrchestratorError>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Demand fetches issued across both stages.
    pub fn total_calls(&self) -> u32 {
        self.stage_one.calls + self.stage_two.calls
    }

    /// The report for `stage`, `None` for `Done`.
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        match stage {
            Stage::One => Some(&self.stage_one),
            Stage::Two => Some(&self.stage_two),
            Stage::Done => None,
        }
    }

    /// Convert into a `Result`, keeping the report on success.
    pub fn into_result(self) -> Result<RunReport, OrchestratorError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
