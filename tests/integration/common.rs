//! Shared test harness: a supervisor wired to a scripted provider, an
//! in-memory database, and a captured event stream.

use std::sync::Arc;

use tokio::sync::mpsc;

use overseer::{
    register_builtin_tools, Database, EventSink, KnowledgeStore, Session, SessionService,
    Supervisor, SupervisorConfig, ToolRegistry,
};
use overseer_core::TurnEvent;
use overseer_llm::{MockProvider, StreamUnit, ToolCallRequest};

pub struct Harness {
    pub supervisor: Supervisor,
    pub provider: Arc<MockProvider>,
    pub sessions: Arc<SessionService>,
    pub session: Session,
    pub events: mpsc::UnboundedReceiver<TurnEvent>,
}

impl Harness {
    /// Build a harness with the builtin tool suite and the given
    /// scripted provider.
    pub fn new(provider: MockProvider) -> Self {
        Self::with_registry(provider, |registry| register_builtin_tools(registry))
    }

    /// Build a harness with a custom registry setup.
    pub fn with_registry(
        provider: MockProvider,
        configure: impl FnOnce(&mut ToolRegistry),
    ) -> Self {
        let provider = Arc::new(provider);
        let sessions = Arc::new(SessionService::new(Database::new_in_memory().unwrap()));
        let session = sessions.create().unwrap();

        let mut registry = ToolRegistry::new();
        configure(&mut registry);

        let (sink, events) = EventSink::channel();
        let supervisor = Supervisor::new(
            Arc::clone(&provider) as Arc<dyn overseer_llm::CompletionProvider>,
            Arc::new(registry),
            Arc::clone(&sessions),
            Arc::new(KnowledgeStore::new()),
            sink,
            SupervisorConfig::default(),
        );

        Self {
            supervisor,
            provider,
            sessions,
            session,
            events,
        }
    }

    /// Drain every event emitted so far.
    pub fn drain_events(&mut self) -> Vec<TurnEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Stream-unit shorthand for scripts.
pub fn text(t: &str) -> StreamUnit {
    StreamUnit::TextDelta {
        text: t.to_string(),
    }
}

pub fn thought(t: &str) -> StreamUnit {
    StreamUnit::ThoughtDelta {
        text: t.to_string(),
    }
}

pub fn call(name: &str, args: serde_json::Value) -> StreamUnit {
    StreamUnit::FunctionCall(ToolCallRequest {
        name: name.to_string(),
        call_id: None,
        args,
    })
}
