//! Plan Gate and Execution-Class Ordering
//!
//! Verifies the two tool-execution invariants end to end: a plan
//! proposal suppresses every other call in its batch, and blocking-class
//! executors fully settle before non-blocking ones start.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use overseer::{
    ExecutionClass, Tool, ToolExecutionContext, ToolResult, TurnOptions,
};
use overseer_core::TurnEvent;
use overseer_llm::{MockProvider, ParameterSchema};

use crate::common::{call, text, Harness};

/// Test tool that records invocations and start/end order.
struct ProbeTool {
    name: String,
    class: ExecutionClass,
    delay: Duration,
    calls: Arc<AtomicU32>,
    trace: Arc<AsyncMutex<Vec<String>>>,
}

impl ProbeTool {
    fn new(name: &str, class: ExecutionClass, trace: Arc<AsyncMutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            class,
            delay: Duration::from_millis(0),
            calls: Arc::new(AtomicU32::new(0)),
            trace,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Tool for ProbeTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "probe"
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::object(None, HashMap::new(), vec![])
    }

    fn execution_class(&self) -> ExecutionClass {
        self.class
    }

    async fn execute(&self, _ctx: &ToolExecutionContext, _args: Value) -> ToolResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.trace.lock().await.push(format!("start:{}", self.name));
        tokio::time::sleep(self.delay).await;
        self.trace.lock().await.push(format!("end:{}", self.name));
        ToolResult::ok("probed")
    }
}

#[tokio::test]
async fn test_plan_gate_suppresses_sibling_calls() {
    // One batch: propose_plan plus write_file. The write must never
    // execute and the turn must stop awaiting approval.
    let provider = MockProvider::new(vec![vec![
        call(
            "propose_plan",
            serde_json::json!({
                "title": "Do it later",
                "steps": [{"task": "Everything"}],
            }),
        ),
        call(
            "write_file",
            serde_json::json!({"path": "README.md", "content": "hello"}),
        ),
    ]]);
    let mut harness = Harness::new(provider);

    harness
        .supervisor
        .run_turn(&harness.session.id, "make a plan", None, TurnOptions::default())
        .await
        .unwrap();

    // Loop stopped after one round, awaiting approval
    assert_eq!(harness.provider.attempts(), 1);

    let session = harness.sessions.get(&harness.session.id).unwrap();
    // The write executor never ran: nothing landed in the VFS
    assert!(session.files.is_empty());
    assert!(session.plan.is_some());

    // The write_file response carries the blocked marker
    let responses = &session.history[2];
    let blocked = responses
        .parts
        .iter()
        .find_map(|p| match p {
            overseer_llm::Part::FunctionResponse { name, response, .. }
                if name == "write_file" =>
            {
                Some(response.clone())
            }
            _ => None,
        })
        .expect("write_file response present");
    assert_eq!(blocked["status"], "blocked");
    assert!(blocked["reason"].as_str().unwrap().contains("approved"));

    // planProposed fired exactly once
    let proposals = harness
        .drain_events()
        .iter()
        .filter(|e| matches!(e, TurnEvent::PlanProposed { .. }))
        .count();
    assert_eq!(proposals, 1);
}

#[tokio::test]
async fn test_blocking_settles_before_non_blocking_across_a_turn() {
    let trace = Arc::new(AsyncMutex::new(Vec::new()));
    let blocking = ProbeTool::new("deep_analysis", ExecutionClass::Blocking, Arc::clone(&trace))
        .with_delay(Duration::from_millis(40));
    let non_blocking = ProbeTool::new("quick_lookup", ExecutionClass::NonBlocking, Arc::clone(&trace));
    let blocking_calls = blocking.counter();
    let non_blocking_calls = non_blocking.counter();

    let provider = MockProvider::new(vec![
        vec![
            call("quick_lookup", serde_json::json!({})),
            call("deep_analysis", serde_json::json!({})),
        ],
        vec![text("all settled")],
    ]);
    let harness = Harness::with_registry(provider, move |registry| {
        registry.register(Arc::new(blocking));
        registry.register(Arc::new(non_blocking));
    });

    let answer = harness
        .supervisor
        .run_turn(&harness.session.id, "go", None, TurnOptions::default())
        .await
        .unwrap();
    assert_eq!(answer, "all settled");
    assert_eq!(blocking_calls.load(Ordering::SeqCst), 1);
    assert_eq!(non_blocking_calls.load(Ordering::SeqCst), 1);

    let trace = trace.lock().await;
    let blocking_end = trace.iter().position(|t| t == "end:deep_analysis").unwrap();
    let non_blocking_start = trace.iter().position(|t| t == "start:quick_lookup").unwrap();
    assert!(
        blocking_end < non_blocking_start,
        "non-blocking executor started before the blocking group settled: {:?}",
        *trace
    );
}

#[tokio::test]
async fn test_tool_failure_feeds_back_without_aborting() {
    // Unknown tool in the same batch as a working one: the turn
    // continues and the model sees both payloads.
    let provider = MockProvider::new(vec![
        vec![
            call("no_such_tool", serde_json::json!({})),
            call(
                "write_file",
                serde_json::json!({"path": "ok.txt", "content": "fine"}),
            ),
        ],
        vec![text("handled it")],
    ]);
    let mut harness = Harness::new(provider);

    let answer = harness
        .supervisor
        .run_turn(&harness.session.id, "go", None, TurnOptions::default())
        .await
        .unwrap();
    assert_eq!(answer, "handled it");

    let session = harness.sessions.get(&harness.session.id).unwrap();
    assert_eq!(session.files["ok.txt"].content, "fine");

    let responses = &session.history[2];
    let statuses: Vec<&str> = responses
        .parts
        .iter()
        .filter_map(|p| match p {
            overseer_llm::Part::FunctionResponse { response, .. } => response["status"].as_str(),
            _ => None,
        })
        .collect();
    assert!(statuses.contains(&"error"));
    assert!(statuses.contains(&"ok"));

    // The failure surfaced as a failed thinking step
    let events = harness.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::Thinking { step }
            if step.status == overseer_core::StepStatus::Failed
                && step.content.contains("no_such_tool")
    )));
}

#[tokio::test]
async fn test_chart_call_emits_payload_and_folds_into_message() {
    let payload = serde_json::json!({
        "kind": "bar",
        "labels": ["Q1", "Q2"],
        "values": [10, 20],
    });
    let provider = MockProvider::new(vec![
        vec![call("render_chart", payload.clone())],
        vec![text("chart ready")],
    ]);
    let mut harness = Harness::new(provider);

    harness
        .supervisor
        .run_turn(&harness.session.id, "chart it", None, TurnOptions::default())
        .await
        .unwrap();

    let events = harness.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::ChartData { payload: p } if *p == payload
    )));

    let session = harness.sessions.get(&harness.session.id).unwrap();
    assert_eq!(session.charts, vec![payload.clone()]);
    let assistant = session.messages.last().unwrap();
    assert_eq!(assistant.charts, vec![payload]);
}
