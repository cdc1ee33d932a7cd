//! Plan Model
//!
//! A plan is proposed by the agent, reviewed by the user, and executed
//! step by step after approval. Once approved and executing, the plan is
//! immutable except for per-step status transitions, which are monotonic
//! (pending -> in_progress -> completed) and idempotent: re-applying a
//! status the step already holds, or a status behind it, is a no-op.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Approval lifecycle of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// Proposed by the agent, awaiting user review
    Proposed,
    /// Approved by the user; execution may proceed
    Approved,
    /// Rejected by the user
    Rejected,
}

/// Execution status of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for PlanStepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStepStatus::Pending => write!(f, "pending"),
            PlanStepStatus::InProgress => write!(f, "in_progress"),
            PlanStepStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A single step in a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Unique step identifier (e.g., "step-1")
    pub id: String,
    /// What this step should accomplish
    pub task: String,
    /// Current execution status
    #[serde(default = "default_step_status")]
    pub status: PlanStepStatus,
    /// Whether this step needs explicit user approval before running
    #[serde(default)]
    pub requires_approval: bool,
    /// Whether this step may run in parallel with its neighbors
    #[serde(default)]
    pub parallel: bool,
    /// Whether the user approved this step
    #[serde(default)]
    pub approved: bool,
}

fn default_step_status() -> PlanStepStatus {
    PlanStepStatus::Pending
}

impl PlanStep {
    /// Create a pending, unapproved step.
    pub fn new(id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            status: PlanStepStatus::Pending,
            requires_approval: false,
            parallel: false,
            approved: false,
        }
    }
}

/// A proposed or executing plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Plan title
    pub title: String,
    /// Ordered steps
    pub steps: Vec<PlanStep>,
    /// Approval lifecycle state
    #[serde(default = "default_approval")]
    pub approval: ApprovalState,
}

fn default_approval() -> ApprovalState {
    ApprovalState::Proposed
}

impl Plan {
    /// Create a newly proposed plan.
    pub fn new(title: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            title: title.into(),
            steps,
            approval: ApprovalState::Proposed,
        }
    }

    /// Mark the plan approved and record which steps the user approved.
    /// Step ids not present in the plan are ignored.
    pub fn approve(&mut self, approved_step_ids: &[String]) {
        self.approval = ApprovalState::Approved;
        for step in &mut self.steps {
            if approved_step_ids.iter().any(|id| id == &step.id) {
                step.approved = true;
            }
        }
    }

    /// Mark the plan rejected.
    pub fn reject(&mut self) {
        self.approval = ApprovalState::Rejected;
    }

    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Apply a status transition to the named step.
    ///
    /// Transitions are monotonic: a status at or behind the step's current
    /// status is a no-op. Returns whether the step actually changed, or
    /// `CoreError::NotFound` for an unknown step id.
    pub fn advance_step(&mut self, step_id: &str, status: PlanStepStatus) -> CoreResult<bool> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| CoreError::not_found(format!("plan step: {}", step_id)))?;
        if status <= step.status {
            return Ok(false);
        }
        step.status = status;
        Ok(true)
    }

    /// Whether every approved step has completed.
    pub fn is_complete(&self) -> bool {
        self.steps
            .iter()
            .filter(|s| s.approved || !s.requires_approval)
            .all(|s| s.status == PlanStepStatus::Completed)
    }
}
