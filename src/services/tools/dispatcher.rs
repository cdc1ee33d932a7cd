//! Tool Dispatcher
//!
//! Executes the batch of tool calls produced by one model turn. The
//! batch is gated (a plan proposal suppresses every other call), then
//! partitioned by execution class: blocking-class calls run as one
//! concurrent group and are fully awaited before the non-blocking group
//! starts. Individual failures never abort the batch; they degrade to a
//! failed thinking step plus an error payload fed back to the model.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::mpsc;

use overseer_core::{Plan, PlanStepStatus, StepStatus, ThinkingStep};
use overseer_llm::Part;

use crate::services::events::EventSink;
use crate::services::tools::registry::{
    ExecutionClass, ProgressNote, Tool, ToolExecutionContext, ToolRegistry, ToolResult,
};
use crate::utils::text::first_line_capped;

/// Name of the plan-proposal tool that triggers the plan gate.
pub const PROPOSE_PLAN_TOOL: &str = "propose_plan";

/// Name of the step-report tool that drives plan-step status.
pub const REPORT_STEP_TOOL: &str = "report_step_done";

/// Name of the chart tool whose arguments are forwarded verbatim.
pub const CHART_TOOL: &str = "render_chart";

/// Characters kept in a step's short content line.
const STEP_CONTENT_MAX_CHARS: usize = 120;

/// A tool call with its correlation id already resolved.
#[derive(Debug, Clone)]
pub struct ResolvedToolCall {
    pub name: String,
    pub call_id: String,
    pub args: Value,
}

impl ResolvedToolCall {
    /// The history part this call was recorded as.
    pub fn as_part(&self) -> Part {
        Part::FunctionCall {
            name: self.name.clone(),
            call_id: self.call_id.clone(),
            args: self.args.clone(),
        }
    }
}

/// Aggregated result of one batch.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// One function-response part per request (order is not guaranteed
    /// to match the input order)
    pub responses: Vec<Part>,
    /// Paths written by write-type tools during the batch
    pub files_written: Vec<String>,
    /// Plan proposed during the batch, if any
    pub proposed_plan: Option<Plan>,
    /// Chart payloads forwarded during the batch
    pub charts: Vec<Value>,
    /// Thinking steps emitted during the batch, in emission order, so
    /// the caller can fold them into the turn's UI message
    pub steps: Vec<ThinkingStep>,
    /// Whether any blocking-class call was executed
    pub had_blocking: bool,
}

/// Result of one isolated call execution.
struct CallOutput {
    response: Part,
    written_path: Option<String>,
    plan: Option<Plan>,
    chart: Option<Value>,
    steps: Vec<ThinkingStep>,
}

/// Executes tool-call batches against a registry.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Execute one model turn's worth of tool calls.
    pub async fn execute_batch(
        &self,
        ctx: &ToolExecutionContext,
        sink: &EventSink,
        calls: Vec<ResolvedToolCall>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        if calls.is_empty() {
            return outcome;
        }

        // Plan gate: once the agent asks to propose a plan, no other
        // requested action in the same batch may take effect.
        let gate_active = calls.iter().any(|c| c.name == PROPOSE_PLAN_TOOL);
        let (to_run, gated): (Vec<_>, Vec<_>) = if gate_active {
            calls.into_iter().partition(|c| c.name == PROPOSE_PLAN_TOOL)
        } else {
            (calls, Vec::new())
        };

        for call in gated {
            tracing::debug!(tool = %call.name, "blocked by plan gate");
            outcome.responses.push(Part::FunctionResponse {
                name: call.name,
                call_id: call.call_id,
                response: blocked_payload(),
            });
        }

        // Forward in-flight progress notes as thinking-step updates.
        let (progress_tx, progress_rx) = mpsc::unbounded_channel::<ProgressNote>();
        let labels: HashMap<String, String> = to_run
            .iter()
            .filter_map(|c| {
                self.registry
                    .get(&c.name)
                    .filter(|t| !t.is_silent())
                    .map(|t| (c.call_id.clone(), t.display_label()))
            })
            .collect();
        let forwarder = spawn_progress_forwarder(progress_rx, labels, sink.clone());
        let ctx = ctx.clone().with_progress(progress_tx);

        // Partition by execution class, exhaustively.
        let mut blocking = Vec::new();
        let mut non_blocking = Vec::new();
        for call in to_run {
            match self.registry.classify(&call.name) {
                ExecutionClass::Blocking => blocking.push(call),
                ExecutionClass::NonBlocking => non_blocking.push(call),
            }
        }
        outcome.had_blocking = !blocking.is_empty();

        // Blocking group first, fully awaited, then the non-blocking
        // group; members of a group run concurrently.
        for group in [blocking, non_blocking] {
            let executions = group
                .into_iter()
                .map(|call| self.execute_one(&ctx, sink, call));
            for output in join_all(executions).await {
                outcome.responses.push(output.response);
                if let Some(path) = output.written_path {
                    outcome.files_written.push(path);
                }
                if let Some(plan) = output.plan {
                    outcome.proposed_plan = Some(plan);
                }
                if let Some(chart) = output.chart {
                    outcome.charts.push(chart);
                }
                outcome.steps.extend(output.steps);
            }
        }

        // All per-call contexts are gone, so the progress channel is
        // closed and the forwarder drains out.
        drop(ctx);
        let _ = forwarder.await;

        outcome
    }

    /// Execute one call in isolation: emit step updates, never propagate
    /// the error.
    async fn execute_one(
        &self,
        ctx: &ToolExecutionContext,
        sink: &EventSink,
        call: ResolvedToolCall,
    ) -> CallOutput {
        let mut steps = Vec::new();
        let mut emit = |sink: &EventSink, step: ThinkingStep| {
            sink.thinking(step.clone());
            steps.push(step);
        };

        let Some(tool) = self.registry.get(&call.name) else {
            let message = format!("Unknown tool: {}", call.name);
            tracing::warn!("{}", message);
            emit(
                sink,
                ThinkingStep::new(&call.call_id, &call.name, &call.name, StepStatus::Failed)
                    .with_content(message.clone()),
            );
            return CallOutput {
                response: Part::FunctionResponse {
                    name: call.name,
                    call_id: call.call_id,
                    response: ToolResult::err(message).into_response_payload(),
                },
                written_path: None,
                plan: None,
                chart: None,
                steps,
            };
        };

        let silent = tool.is_silent();
        if !silent {
            emit(
                sink,
                ThinkingStep::new(&call.call_id, tool.name(), tool.display_label(), StepStatus::Active),
            );
        }

        let call_ctx = ctx.for_call(&call.call_id);
        let result = tool.execute(&call_ctx, call.args.clone()).await;

        if result.success {
            if !silent {
                let detail = serde_json::to_string(&result).unwrap_or_default();
                let content =
                    first_line_capped(result.output.as_deref().unwrap_or(""), STEP_CONTENT_MAX_CHARS);
                emit(
                    sink,
                    ThinkingStep::new(&call.call_id, tool.name(), tool.display_label(), StepStatus::Completed)
                        .with_content(content)
                        .with_detail(detail),
                );
            }
        } else {
            let message = result.error.clone().unwrap_or_else(|| "Unknown error".to_string());
            tracing::warn!(tool = %call.name, "tool execution failed: {}", message);
            emit(
                sink,
                ThinkingStep::new(&call.call_id, tool.name(), tool.display_label(), StepStatus::Failed)
                    .with_content(message),
            );
        }

        let side_effects = self.apply_side_effects(&call, &result, sink);

        CallOutput {
            response: Part::FunctionResponse {
                name: call.name,
                call_id: call.call_id,
                response: result.into_response_payload(),
            },
            written_path: side_effects.0,
            plan: side_effects.1,
            chart: side_effects.2,
            steps,
        }
    }

    /// Side effects beyond the return value: plan proposals, chart
    /// forwarding, step reports, and written-path accumulation.
    fn apply_side_effects(
        &self,
        call: &ResolvedToolCall,
        result: &ToolResult,
        sink: &EventSink,
    ) -> (Option<String>, Option<Plan>, Option<Value>) {
        if !result.success {
            return (None, None, None);
        }

        let mut plan = None;
        let mut chart = None;

        if call.name == PROPOSE_PLAN_TOOL {
            if let Some(parsed) = result
                .data
                .as_ref()
                .and_then(|d| serde_json::from_value::<Plan>(d.clone()).ok())
            {
                sink.plan_proposed(parsed.clone());
                plan = Some(parsed);
            }
        }

        if call.name == CHART_TOOL {
            sink.chart_data(call.args.clone());
            chart = Some(call.args.clone());
        }

        if call.name == REPORT_STEP_TOOL {
            if let Some(step_id) = call.args.get("step_id").and_then(|v| v.as_str()) {
                sink.plan_step_update(step_id, PlanStepStatus::Completed);
            }
        }

        let written_path = result
            .data
            .as_ref()
            .and_then(|d| d.get("path"))
            .and_then(|p| p.as_str())
            .map(|p| p.to_string());

        (written_path, plan, chart)
    }
}

/// Synthetic response for calls suppressed by the plan gate.
fn blocked_payload() -> Value {
    serde_json::json!({
        "status": "blocked",
        "reason": "execution blocked: a proposed plan must be approved first",
    })
}

fn spawn_progress_forwarder(
    mut rx: mpsc::UnboundedReceiver<ProgressNote>,
    labels: HashMap<String, String>,
    sink: EventSink,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(note) = rx.recv().await {
            let Some(label) = labels.get(&note.call_id) else {
                continue;
            };
            sink.thinking(
                ThinkingStep::new(&note.call_id, "tool", label.clone(), StepStatus::Active)
                    .with_content(note.status),
            );
        }
    })
}
