//! Plan Tools
//!
//! `propose_plan` builds a plan from the model's step list, stores it on
//! the session awaiting approval, and returns it as side-channel data so
//! the dispatcher can fire the plan-proposed callback. Blocking class:
//! its result must settle before anything lighter runs (and the plan
//! gate ends the turn anyway).
//!
//! `report_step_done` marks a plan step completed. The transition is
//! monotonic and idempotent; the dispatcher emits the matching
//! plan-step-update event.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use overseer_core::{Plan, PlanStep, PlanStepStatus};
use overseer_llm::ParameterSchema;

use crate::services::tools::registry::{
    ExecutionClass, Tool, ToolExecutionContext, ToolResult,
};
use crate::utils::error::AppError;

pub struct ProposePlanTool;

impl ProposePlanTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProposePlanTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ProposePlanTool {
    fn name(&self) -> &str {
        "propose_plan"
    }

    fn description(&self) -> &str {
        "Propose a multi-step plan for a complex task and wait for the user to approve it. Do not perform any other action in the same turn as a plan proposal."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut step_properties = HashMap::new();
        step_properties.insert(
            "task".to_string(),
            ParameterSchema::string(Some("What this step should accomplish")),
        );
        step_properties.insert(
            "requires_approval".to_string(),
            ParameterSchema::boolean(Some("Whether this step needs explicit approval")),
        );
        step_properties.insert(
            "parallel".to_string(),
            ParameterSchema::boolean(Some("Whether this step may run alongside its neighbors")),
        );

        let mut properties = HashMap::new();
        properties.insert(
            "title".to_string(),
            ParameterSchema::string(Some("Short plan title")),
        );
        properties.insert(
            "steps".to_string(),
            ParameterSchema::array(
                Some("Ordered plan steps"),
                ParameterSchema::object(None, step_properties, vec!["task".to_string()]),
            ),
        );
        ParameterSchema::object(
            Some("Propose plan parameters"),
            properties,
            vec!["title".to_string(), "steps".to_string()],
        )
    }

    fn display_label(&self) -> String {
        "Proposing a plan".to_string()
    }

    fn execution_class(&self) -> ExecutionClass {
        ExecutionClass::Blocking
    }

    async fn execute(&self, ctx: &ToolExecutionContext, args: Value) -> ToolResult {
        let title = match args.get("title").and_then(|v| v.as_str()) {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => return ToolResult::err("Missing required parameter: title"),
        };
        let raw_steps = match args.get("steps").and_then(|v| v.as_array()) {
            Some(steps) if !steps.is_empty() => steps,
            _ => return ToolResult::err("A plan needs at least one step"),
        };

        let mut steps = Vec::with_capacity(raw_steps.len());
        for (index, raw) in raw_steps.iter().enumerate() {
            let Some(task) = raw.get("task").and_then(|v| v.as_str()) else {
                return ToolResult::err(format!("Step {} is missing its task", index + 1));
            };
            let mut step = PlanStep::new(format!("step-{}", index + 1), task);
            step.requires_approval = raw
                .get("requires_approval")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            step.parallel = raw.get("parallel").and_then(|v| v.as_bool()).unwrap_or(false);
            steps.push(step);
        }

        let plan = Plan::new(title, steps);
        if let Err(e) = ctx.sessions.set_plan(&ctx.session_id, Some(plan.clone())) {
            return ToolResult::err(format!("Failed to store plan: {}", e));
        }

        let data = match serde_json::to_value(&plan) {
            Ok(d) => d,
            Err(e) => return ToolResult::err(format!("Failed to serialize plan: {}", e)),
        };
        ToolResult::ok(format!(
            "Proposed plan \"{}\" with {} steps; awaiting approval",
            plan.title,
            plan.steps.len()
        ))
        .with_data(data)
    }
}

pub struct ReportStepTool;

impl ReportStepTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReportStepTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReportStepTool {
    fn name(&self) -> &str {
        "report_step_done"
    }

    fn description(&self) -> &str {
        "Report that a plan step has been completed. Call this after finishing the work for a step of the approved plan."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "step_id".to_string(),
            ParameterSchema::string(Some("Id of the completed plan step (e.g. \"step-2\")")),
        );
        ParameterSchema::object(
            Some("Report step parameters"),
            properties,
            vec!["step_id".to_string()],
        )
    }

    fn display_label(&self) -> String {
        "Updating plan progress".to_string()
    }

    async fn execute(&self, ctx: &ToolExecutionContext, args: Value) -> ToolResult {
        let step_id = match args.get("step_id").and_then(|v| v.as_str()) {
            Some(id) if !id.trim().is_empty() => id.trim(),
            _ => return ToolResult::err("Missing required parameter: step_id"),
        };

        match ctx
            .sessions
            .advance_plan_step(&ctx.session_id, step_id, PlanStepStatus::Completed)
        {
            Ok(true) => ToolResult::ok(format!("Marked {} completed", step_id)),
            Ok(false) => ToolResult::ok(format!("{} was already completed", step_id)),
            Err(AppError::NotFound(msg)) => ToolResult::err(msg),
            Err(AppError::Core(e)) => ToolResult::err(e.to_string()),
            Err(e) => ToolResult::err(format!("Failed to update step: {}", e)),
        }
    }
}
