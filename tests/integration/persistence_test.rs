//! Session Persistence and Turn Serialization
//!
//! Round-trip and concurrency properties of the session store as driven
//! through full turns.

use overseer::{AppError, TurnOptions};
use overseer_llm::MockProvider;

use crate::common::{call, text, thought, Harness};

#[tokio::test]
async fn test_persisted_session_round_trips_identically() {
    let provider = MockProvider::new(vec![
        vec![
            thought("planning the file"),
            call(
                "write_file",
                serde_json::json!({"path": "notes.md", "content": "# Notes"}),
            ),
        ],
        vec![text("wrote your notes")],
    ]);
    let harness = Harness::new(provider);

    harness
        .supervisor
        .run_turn(&harness.session.id, "take notes", None, TurnOptions::default())
        .await
        .unwrap();

    // Two independent loads must agree field for field
    let first = harness.sessions.get(&harness.session.id).unwrap();
    let second = harness.sessions.get(&harness.session.id).unwrap();

    assert_eq!(first.history.len(), second.history.len());
    assert_eq!(first.messages.len(), second.messages.len());
    assert_eq!(first.files, second.files);
    assert_eq!(
        serde_json::to_value(&first.messages).unwrap(),
        serde_json::to_value(&second.messages).unwrap()
    );

    // And the content is what the turn produced
    assert_eq!(first.messages.len(), 2);
    assert_eq!(first.files["notes.md"].content, "# Notes");
    let assistant = first.messages.last().unwrap();
    assert_eq!(assistant.content, "wrote your notes");
    assert_eq!(assistant.files_written, vec!["notes.md".to_string()]);
    assert!(!assistant.steps.is_empty());
}

#[tokio::test]
async fn test_title_set_from_first_input() {
    let provider = MockProvider::new(vec![vec![text("hi")], vec![text("again")]]);
    let harness = Harness::new(provider);

    harness
        .supervisor
        .run_turn(
            &harness.session.id,
            "summarize the quarterly numbers",
            None,
            TurnOptions::default(),
        )
        .await
        .unwrap();
    harness
        .supervisor
        .run_turn(&harness.session.id, "and now?", None, TurnOptions::default())
        .await
        .unwrap();

    let summaries = harness.sessions.list().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "summarize the quarterly numbers");
    assert_eq!(summaries[0].message_count, 4);
}

#[tokio::test]
async fn test_concurrent_turn_rejected_while_busy() {
    let provider = MockProvider::new(vec![vec![text("first")], vec![text("second")]]);
    let harness = Harness::new(provider);

    // Hold the turn slot the way a running turn does
    let guard = harness.sessions.begin_turn(&harness.session.id).unwrap();
    let result = harness
        .supervisor
        .run_turn(&harness.session.id, "hi", None, TurnOptions::default())
        .await;
    assert!(matches!(result, Err(AppError::SessionBusy(_))));
    drop(guard);

    // After release the turn runs normally
    let answer = harness
        .supervisor
        .run_turn(&harness.session.id, "hi", None, TurnOptions::default())
        .await
        .unwrap();
    assert_eq!(answer, "first");
}

#[tokio::test]
async fn test_independent_sessions_run_concurrently() {
    let provider = MockProvider::new(vec![vec![text("a")], vec![text("b")]]);
    let harness = Harness::new(provider);
    let other = harness.sessions.create().unwrap();

    // Both sessions can hold turn slots at once
    let _first = harness.sessions.begin_turn(&harness.session.id).unwrap();
    let _second = harness.sessions.begin_turn(&other.id).unwrap();
}

#[tokio::test]
async fn test_explicit_delete_only() {
    let provider = MockProvider::new(vec![vec![text("hello")]]);
    let harness = Harness::new(provider);

    harness
        .supervisor
        .run_turn(&harness.session.id, "hi", None, TurnOptions::default())
        .await
        .unwrap();

    // The turn never deletes; the caller does
    assert!(harness.sessions.get(&harness.session.id).is_ok());
    harness.sessions.delete(&harness.session.id).unwrap();
    assert!(matches!(
        harness.sessions.get(&harness.session.id),
        Err(AppError::NotFound(_))
    ));
}
