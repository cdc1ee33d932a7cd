//! Turn Event Types
//!
//! The typed events the orchestration loop pushes to its observer (UI or
//! test harness) while a turn runs. Delivery is ordered and at-least-once
//! per logical update: the loop may re-emit a corrected cumulative value,
//! and text events always carry the full accumulated content rather than
//! a delta, so a reconnecting consumer never loses text.

use serde::{Deserialize, Serialize};

use crate::plan::{Plan, PlanStepStatus};
use crate::thinking::ThinkingStep;

/// Event pushed from the orchestration loop to the observer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A thinking step was created or updated (keyed by step id)
    Thinking { step: ThinkingStep },

    /// Cumulative assistant text for the current turn
    Text { content: String },

    /// The agent proposed a plan and is waiting for approval
    PlanProposed { plan: Plan },

    /// Chart payload forwarded verbatim from the chart tool
    ChartData { payload: serde_json::Value },

    /// Virtual files were written during the turn
    FilesWritten { paths: Vec<String> },

    /// A plan step changed status
    PlanStepUpdate {
        step_id: String,
        status: PlanStepStatus,
    },

    /// The turn finished
    Done,

    /// The turn failed terminally
    Error { message: String },
}

impl TurnEvent {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            TurnEvent::Thinking { .. } => "thinking",
            TurnEvent::Text { .. } => "text",
            TurnEvent::PlanProposed { .. } => "plan_proposed",
            TurnEvent::ChartData { .. } => "chart_data",
            TurnEvent::FilesWritten { .. } => "files_written",
            TurnEvent::PlanStepUpdate { .. } => "plan_step_update",
            TurnEvent::Done => "done",
            TurnEvent::Error { .. } => "error",
        }
    }
}
