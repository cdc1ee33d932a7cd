//! Overseer Core
//!
//! Leaf types shared across the Overseer engine: turn events, thinking
//! steps, the plan model, and the core error type. This crate is
//! dependency-light by design so that both the LLM boundary crate and the
//! engine can depend on it.

pub mod error;
pub mod events;
pub mod plan;
pub mod thinking;

pub use error::{CoreError, CoreResult};
pub use events::TurnEvent;
pub use plan::{ApprovalState, Plan, PlanStep, PlanStepStatus};
pub use thinking::{dedup_steps, StepStatus, ThinkingStep};
