//! Tool Trait and Registry
//!
//! Defines the unified `Tool` trait and the `ToolRegistry` the engine is
//! configured with. The registry is an explicitly constructed instance
//! passed into the engine, never a process-wide map, so tests can hold
//! isolated registries side by side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use overseer_llm::{ParameterSchema, ToolDefinition};

use crate::services::knowledge::KnowledgeStore;
use crate::services::session::SessionService;

/// Whether a tool's result must settle before lighter-weight calls run.
///
/// Blocking-class tools (plan proposal, deep requirement analysis) are
/// executed as one concurrent group and fully awaited before any
/// non-blocking executor begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionClass {
    Blocking,
    NonBlocking,
}

/// Where a registration came from. Supports bulk teardown when an
/// external bridge disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    Builtin,
    Bridge,
    User,
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured side-channel payload (plan object, written path, chart
    /// confirmation) consumed by the dispatcher
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            data: None,
        }
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            data: None,
        }
    }

    /// Attach a structured side-channel payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Shape this result into the payload fed back to the model.
    pub fn into_response_payload(self) -> Value {
        if self.success {
            serde_json::json!({
                "status": "ok",
                "output": self.output.unwrap_or_default(),
            })
        } else {
            serde_json::json!({
                "status": "error",
                "error": self.error.as_deref().unwrap_or("Unknown error"),
            })
        }
    }
}

/// A progress note reported by a running tool, keyed by call id.
#[derive(Debug, Clone)]
pub struct ProgressNote {
    pub call_id: String,
    pub status: String,
}

/// Context provided to each tool during execution.
///
/// Carries everything a tool needs (session access, the knowledge
/// store, cancellation, a progress reporter) so tool
/// implementations do not depend on dispatcher-private state.
#[derive(Clone)]
pub struct ToolExecutionContext {
    /// Session the tool was invoked against
    pub session_id: String,
    /// Session persistence service
    pub sessions: Arc<SessionService>,
    /// Knowledge store behind search_knowledge
    pub knowledge: Arc<KnowledgeStore>,
    /// Cancellation token for cooperative cancellation
    pub cancellation_token: CancellationToken,
    progress_tx: Option<mpsc::UnboundedSender<ProgressNote>>,
    call_id: String,
}

impl ToolExecutionContext {
    /// Create a context for a session.
    pub fn new(
        session_id: impl Into<String>,
        sessions: Arc<SessionService>,
        knowledge: Arc<KnowledgeStore>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            sessions,
            knowledge,
            cancellation_token: CancellationToken::new(),
            progress_tx: None,
            call_id: String::new(),
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Attach a progress channel.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ProgressNote>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Derive a per-call context carrying the call's correlation id.
    pub(crate) fn for_call(&self, call_id: &str) -> Self {
        let mut ctx = self.clone();
        ctx.call_id = call_id.to_string();
        ctx
    }

    /// Report a progress status line for the current call. May be called
    /// zero or more times before the final result.
    pub fn report_progress(&self, status: impl Into<String>) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(ProgressNote {
                call_id: self.call_id.clone(),
                status: status.into(),
            });
        }
    }
}

/// Unified tool interface.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of this tool (e.g., "write_file", "propose_plan")
    fn name(&self) -> &str;

    /// Human-readable description advertised to the completion service
    fn description(&self) -> &str;

    /// JSON schema describing the tool's input parameters
    fn parameters_schema(&self) -> ParameterSchema;

    /// Short label shown in thinking steps. Defaults to the tool name.
    fn display_label(&self) -> String {
        self.name().to_string()
    }

    /// Whether this tool's result must settle before non-blocking calls
    /// run. Default: NonBlocking.
    fn execution_class(&self) -> ExecutionClass {
        ExecutionClass::NonBlocking
    }

    /// Silent tools render through their own UI surface (file writes,
    /// charts) and get no narrated thinking step. Default: false.
    fn is_silent(&self) -> bool {
        false
    }

    /// Execute the tool with the given context and arguments.
    async fn execute(&self, ctx: &ToolExecutionContext, args: Value) -> ToolResult;
}

/// Registry of available tools.
///
/// Provides O(1) lookup by name, idempotent registration (same name
/// overwrites), classification, and bulk unregistration by source.
pub struct ToolRegistry {
    tools: HashMap<String, (Arc<dyn Tool>, ToolSource)>,
    /// Insertion order for deterministic iteration
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a builtin tool. If a tool with the same name already
    /// exists, it is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.register_from(tool, ToolSource::Builtin);
    }

    /// Register a tool with an explicit source tag.
    pub fn register_from(&mut self, tool: Arc<dyn Tool>, source: ToolSource) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, (tool, source));
    }

    /// Unregister a tool by name. Returns the removed tool, or None.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.order.retain(|n| n != name);
        self.tools.remove(name).map(|(tool, _)| tool)
    }

    /// Remove every tool from `source` whose name matches `predicate`.
    /// Returns the names removed. Used for bulk teardown when an
    /// external bridge disconnects.
    pub fn unregister_by_source(
        &mut self,
        source: ToolSource,
        predicate: impl Fn(&str) -> bool,
    ) -> Vec<String> {
        let doomed: Vec<String> = self
            .order
            .iter()
            .filter(|name| {
                self.tools
                    .get(*name)
                    .map(|(_, s)| *s == source && predicate(name))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        for name in &doomed {
            self.unregister(name);
        }
        doomed
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|(tool, _)| tool.clone())
    }

    /// Source tag of a registered tool.
    pub fn source(&self, name: &str) -> Option<ToolSource> {
        self.tools.get(name).map(|(_, source)| *source)
    }

    /// Execution class for a tool name. Unregistered names default to
    /// NonBlocking; callers must treat unknown names as a hard error
    /// before classification.
    pub fn classify(&self, name: &str) -> ExecutionClass {
        self.tools
            .get(name)
            .map(|(tool, _)| tool.execution_class())
            .unwrap_or(ExecutionClass::NonBlocking)
    }

    /// All tool definitions in registration order, for advertising
    /// capabilities to the completion service.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|(tool, _)| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    }

    /// All registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
