//! Orchestration Loop Scenarios
//!
//! Drives full turns against the scripted mock provider and checks the
//! loop's observable guarantees: round counts, cumulative text, thought
//! handling, retry behavior, and the forced round bound.

use overseer::{AppError, PlanResume, TurnOptions};
use overseer_core::{ApprovalState, StepStatus, TurnEvent};
use overseer_llm::{LlmError, MockProvider};

use crate::common::{call, text, thought, Harness};

#[tokio::test]
async fn test_write_readme_scenario() {
    // Round 1: the model writes a file. Round 2: it answers "done".
    let provider = MockProvider::new(vec![
        vec![call(
            "write_file",
            serde_json::json!({"path": "README.md", "content": "hello"}),
        )],
        vec![text("done")],
    ]);
    let mut harness = Harness::new(provider);

    let answer = harness
        .supervisor
        .run_turn(
            &harness.session.id,
            "write a readme",
            None,
            TurnOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(answer, "done");
    // Exactly two completion-service round trips
    assert_eq!(harness.provider.attempts(), 2);

    let session = harness.sessions.get(&harness.session.id).unwrap();
    assert_eq!(session.files["README.md"].content, "hello");

    // The files-written event fired with the path
    let events = harness.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::FilesWritten { paths } if paths == &vec!["README.md".to_string()]
    )));
    // History: user turn, model turn, tool responses, final model turn
    assert_eq!(session.history.len(), 4);
}

#[tokio::test]
async fn test_plain_answer_is_one_round() {
    let provider = MockProvider::new(vec![vec![text("Hello "), text("there")]]);
    let mut harness = Harness::new(provider);

    let answer = harness
        .supervisor
        .run_turn(&harness.session.id, "hi", None, TurnOptions::default())
        .await
        .unwrap();

    assert_eq!(answer, "Hello there");
    assert_eq!(harness.provider.attempts(), 1);

    // Text events are cumulative, never deltas
    let texts: Vec<String> = harness
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            TurnEvent::Text { content } => Some(content),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["Hello ".to_string(), "Hello there".to_string()]);

    // Contiguous fragments coalesced into a single history text part
    let session = harness.sessions.get(&harness.session.id).unwrap();
    let model_turn = &session.history[1];
    assert_eq!(model_turn.parts.len(), 1);
}

#[tokio::test]
async fn test_round_bound_forces_completion() {
    // A stream that always returns another tool call must stop at the
    // bound with whatever text accumulated.
    let provider = MockProvider::with_repeating(vec![
        text("still working... "),
        call("search_knowledge", serde_json::json!({"query": "x"})),
    ]);
    let mut harness = Harness::new(provider);

    let answer = harness
        .supervisor
        .run_turn(&harness.session.id, "loop forever", None, TurnOptions::default())
        .await
        .unwrap();

    assert_eq!(harness.provider.attempts(), 10);
    assert!(answer.starts_with("still working"));

    // The turn still completed gracefully
    let events = harness.drain_events();
    assert!(events.iter().any(|e| matches!(e, TurnEvent::Done)));
    assert!(!events.iter().any(|e| matches!(e, TurnEvent::Error { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retry_then_success() {
    let rate_limited = || LlmError::RateLimited {
        message: "too many requests".to_string(),
        retry_after: None,
    };
    let provider = MockProvider::new(vec![vec![text("recovered")]])
        .fail_first(vec![rate_limited(), rate_limited()]);
    let harness = Harness::new(provider);

    let answer = harness
        .supervisor
        .run_turn(&harness.session.id, "hi", None, TurnOptions::default())
        .await
        .unwrap();

    assert_eq!(answer, "recovered");
    // Two failures plus the success: exactly three open attempts
    assert_eq!(harness.provider.attempts(), 3);
}

#[tokio::test]
async fn test_non_transient_stream_error_aborts_turn() {
    let provider = MockProvider::new(vec![]).fail_first(vec![LlmError::AuthenticationFailed {
        message: "bad key".to_string(),
    }]);
    let mut harness = Harness::new(provider);

    let result = harness
        .supervisor
        .run_turn(&harness.session.id, "hi", None, TurnOptions::default())
        .await;
    assert!(matches!(result, Err(AppError::Completion(_))));

    // Terminal error event, no done event
    let events = harness.drain_events();
    assert!(events.iter().any(|e| matches!(e, TurnEvent::Error { .. })));
    assert!(!events.iter().any(|e| matches!(e, TurnEvent::Done)));

    // The user turn persisted at its checkpoint stays
    let session = harness.sessions.get(&harness.session.id).unwrap();
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.messages.len(), 1);
}

#[tokio::test]
async fn test_session_not_found_before_any_stream() {
    let provider = MockProvider::new(vec![vec![text("never")]]);
    let harness = Harness::new(provider);

    let result = harness
        .supervisor
        .run_turn("no-such-session", "hi", None, TurnOptions::default())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(harness.provider.attempts(), 0);
}

#[tokio::test]
async fn test_thought_stream_becomes_steps() {
    let provider = MockProvider::new(vec![vec![
        thought("Let me look at the data.\n"),
        thought("The trend is upward."),
        text("Revenue is trending up."),
    ]]);
    let mut harness = Harness::new(provider);

    let answer = harness
        .supervisor
        .run_turn(&harness.session.id, "analyze revenue", None, TurnOptions::default())
        .await
        .unwrap();
    assert_eq!(answer, "Revenue is trending up.");

    let steps: Vec<_> = harness
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            TurnEvent::Thinking { step } => Some(step),
            _ => None,
        })
        .collect();

    // All emissions share one thought id; the last is completed and
    // carries the full buffer as detail
    assert!(steps.len() >= 3);
    assert!(steps.windows(2).all(|w| w[0].id == w[1].id));
    let last = steps.last().unwrap();
    assert_eq!(last.status, StepStatus::Completed);
    assert_eq!(last.content, "Let me look at the data.");
    assert!(last.detail.as_deref().unwrap().contains("The trend is upward."));

    // The thought landed in history as its own part, before the text
    let session = harness.sessions.get(&harness.session.id).unwrap();
    let model_turn = &session.history[1];
    assert_eq!(model_turn.parts.len(), 2);
}

#[tokio::test]
async fn test_plan_resume_executes_approved_steps() {
    let provider = MockProvider::new(vec![
        // Turn 1: the model proposes a plan
        vec![call(
            "propose_plan",
            serde_json::json!({
                "title": "Report build",
                "steps": [{"task": "Gather data"}, {"task": "Write summary"}],
            }),
        )],
        // Turn 2 (after approval): execute and report
        vec![call("report_step_done", serde_json::json!({"step_id": "step-1"}))],
        vec![text("step one finished")],
    ]);
    let mut harness = Harness::new(provider);

    harness
        .supervisor
        .run_turn(&harness.session.id, "build a report", None, TurnOptions::default())
        .await
        .unwrap();
    assert_eq!(harness.provider.attempts(), 1);
    harness.drain_events();

    let answer = harness
        .supervisor
        .run_turn(
            &harness.session.id,
            "",
            Some(PlanResume::default()),
            TurnOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(answer, "step one finished");

    let session = harness.sessions.get(&harness.session.id).unwrap();
    let plan = session.plan.unwrap();
    assert_eq!(plan.approval, ApprovalState::Approved);
    assert!(plan.steps.iter().all(|s| s.approved));
    assert_eq!(
        plan.step("step-1").unwrap().status,
        overseer_core::PlanStepStatus::Completed
    );

    // The resume instruction listed the approved steps for the model
    let resume_turn = &session.history[3];
    let instruction = resume_turn.text();
    assert!(instruction.contains("step-1"));
    assert!(instruction.contains("Gather data"));

    // The step update event fired
    let events = harness.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::PlanStepUpdate { step_id, .. } if step_id == "step-1"
    )));
}

#[tokio::test]
async fn test_done_event_fires_once_per_turn() {
    let provider = MockProvider::new(vec![vec![text("ok")]]);
    let mut harness = Harness::new(provider);

    harness
        .supervisor
        .run_turn(&harness.session.id, "hi", None, TurnOptions::default())
        .await
        .unwrap();

    let done_count = harness
        .drain_events()
        .iter()
        .filter(|e| matches!(e, TurnEvent::Done))
        .count();
    assert_eq!(done_count, 1);
}
