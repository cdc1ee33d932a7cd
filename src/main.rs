//! Overseer CLI
//!
//! Minimal line REPL over the engine: streams turn events to stdout and
//! persists sessions under the platform data directory. Provider
//! settings come from the environment:
//!
//! - `OVERSEER_API_KEY`  (required)
//! - `OVERSEER_BASE_URL` (optional, OpenAI-compatible endpoint)
//! - `OVERSEER_MODEL`    (optional, default gpt-4o-mini)

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use overseer::{
    register_builtin_tools, Database, EventSink, KnowledgeStore, PlanResume, SessionService,
    Supervisor, SupervisorConfig, ToolRegistry, TurnOptions,
};
use overseer_core::TurnEvent;
use overseer_llm::{OpenAiProvider, ProviderConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overseer=info".into()),
        )
        .init();

    let api_key = std::env::var("OVERSEER_API_KEY")
        .context("OVERSEER_API_KEY is not set")?;
    let provider = Arc::new(OpenAiProvider::new(ProviderConfig {
        api_key: Some(api_key),
        base_url: std::env::var("OVERSEER_BASE_URL").ok(),
        model: std::env::var("OVERSEER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        ..ProviderConfig::default()
    }));

    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("overseer");
    std::fs::create_dir_all(&data_dir)?;
    let db = Database::open(data_dir.join("sessions.db"))?;
    let sessions = Arc::new(SessionService::new(db));

    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry);

    let (sink, mut events) = EventSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    let supervisor = Supervisor::new(
        provider,
        Arc::new(registry),
        Arc::clone(&sessions),
        Arc::new(KnowledgeStore::new()),
        sink,
        SupervisorConfig::default(),
    );

    let session = sessions.create()?;
    println!("session {}: type a request, \"approve\" to run a proposed plan, ctrl-d to quit", session.id);

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let resume = if input.eq_ignore_ascii_case("approve") {
            Some(PlanResume::default())
        } else {
            None
        };
        let text = if resume.is_some() { "" } else { input };

        match supervisor
            .run_turn(&session.id, text, resume, TurnOptions::default())
            .await
        {
            Ok(answer) => {
                if !answer.is_empty() {
                    println!("\n{}", answer);
                }
            }
            Err(e) => eprintln!("turn failed: {}", e),
        }
    }

    drop(supervisor);
    printer.abort();
    Ok(())
}

fn print_event(event: &TurnEvent) {
    match event {
        TurnEvent::Thinking { step } => {
            println!("  [{}] {}: {}", step.status, step.label, step.content)
        }
        TurnEvent::PlanProposed { plan } => {
            println!("  plan proposed: {} ({} steps)", plan.title, plan.steps.len());
            for step in &plan.steps {
                println!("    - [{}] {}", step.id, step.task);
            }
            println!("  type \"approve\" to execute it");
        }
        TurnEvent::ChartData { payload } => println!("  chart: {}", payload),
        TurnEvent::FilesWritten { paths } => println!("  wrote: {}", paths.join(", ")),
        TurnEvent::PlanStepUpdate { step_id, status } => {
            println!("  step {} -> {}", step_id, status)
        }
        TurnEvent::Error { message } => eprintln!("  error: {}", message),
        // Cumulative text is printed with the final answer; Done ends the turn
        TurnEvent::Text { .. } | TurnEvent::Done => {}
    }
}
