//! Supervisor Orchestration Engine
//!
//! The per-turn control loop: sends history and tool schemas to the
//! completion service, decodes the token/thought/function-call stream,
//! hands tool calls to the dispatcher, appends results to history, and
//! decides whether to continue, stop for plan approval, or finish.
//!
//! The loop is an explicit state machine (Sending, Streaming,
//! ExecutingTools, Deciding, Done) with a hard round bound as the
//! termination backstop.

mod turn;

pub use turn::MAX_TURN_ROUNDS;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use overseer_llm::{CompletionProvider, RequestOptions};

use crate::services::events::EventSink;
use crate::services::knowledge::KnowledgeStore;
use crate::services::session::SessionService;
use crate::services::tools::{ToolDispatcher, ToolRegistry};
use crate::utils::error::AppResult;

/// Default system instruction handed to the completion service.
const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
You are a capable assistant working inside a session workspace. \
Use the available tools to fulfill requests: write files with write_file, \
look up project facts with search_knowledge, visualize data with \
render_chart, and break down complex work with analyze_requirements. \
For multi-step tasks, propose a plan with propose_plan and wait for \
approval before acting; never combine a plan proposal with other tool \
calls. After completing a plan step, report it with report_step_done. \
When you have everything you need, answer in plain text.";

/// Configuration for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Hard bound on completion-service round trips per turn
    pub max_rounds: usize,
    /// Guarded attempts for the stream-open retry wrapper
    pub retry_attempts: u32,
    /// System instruction sent with every request
    pub system_instruction: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_rounds: MAX_TURN_ROUNDS,
            retry_attempts: overseer_llm::DEFAULT_MAX_ATTEMPTS,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

/// Signal that the user approved a previously proposed plan.
#[derive(Debug, Clone, Default)]
pub struct PlanResume {
    /// Steps the user approved. Empty means every step.
    pub approved_step_ids: Vec<String>,
}

/// Per-turn options.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// Mode-specific provider configuration
    pub request: RequestOptions,
    /// Optional external cancellation token, observed between loop states
    pub cancellation: Option<CancellationToken>,
}

/// The turn-by-turn orchestration engine.
pub struct Supervisor {
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<ToolRegistry>,
    dispatcher: ToolDispatcher,
    sessions: Arc<SessionService>,
    knowledge: Arc<KnowledgeStore>,
    sink: EventSink,
    config: SupervisorConfig,
}

impl Supervisor {
    /// Assemble a supervisor from its collaborators.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionService>,
        knowledge: Arc<KnowledgeStore>,
        sink: EventSink,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher: ToolDispatcher::new(Arc::clone(&registry)),
            registry,
            sessions,
            knowledge,
            sink,
            config,
        }
    }

    /// Session service handle for callers that manage sessions directly.
    pub fn sessions(&self) -> Arc<SessionService> {
        Arc::clone(&self.sessions)
    }

    /// Run one turn against a session and return the final answer text.
    ///
    /// Rejects a second concurrent turn for the same session. On a
    /// terminal error the session keeps the state of the last successful
    /// persistence checkpoint; nothing is rolled back.
    pub async fn run_turn(
        &self,
        session_id: &str,
        user_input: &str,
        resume: Option<PlanResume>,
        options: TurnOptions,
    ) -> AppResult<String> {
        // Session lookup failures surface before any stream is opened.
        let session = self.sessions.get(session_id)?;
        let _guard = self.sessions.begin_turn(session_id)?;

        match self.drive_turn(session, user_input, resume, &options).await {
            Ok(text) => {
                self.sink.done();
                Ok(text)
            }
            Err(e) => {
                tracing::error!(session = session_id, "turn failed: {}", e);
                self.sink.error(e.to_string());
                Err(e)
            }
        }
    }
}
