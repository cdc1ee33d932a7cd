//! Overseer
//!
//! Supervisor orchestration engine: a bounded tool-calling agent loop
//! over a streaming completion service, with durable per-session state.
//!
//! The crate is organized like its collaborators expect to use it:
//! - [`services::supervisor`] is the per-turn orchestration loop
//! - [`services::tools`] holds the tool trait, registry, dispatcher, builtins
//! - [`services::session`] handles session persistence and turn serialization
//! - [`services::events`] is the typed event channel to the observer
//! - [`storage`] is the SQLite session database
//!
//! The completion-service boundary lives in the `overseer-llm` crate and
//! shared leaf types in `overseer-core`.

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::session::{Session, SessionSummary, SessionUpdate, UiMessage, VirtualFile};
pub use services::events::EventSink;
pub use services::knowledge::KnowledgeStore;
pub use services::session::SessionService;
pub use services::supervisor::{PlanResume, Supervisor, SupervisorConfig, TurnOptions};
pub use services::tools::{
    register_builtin_tools, ExecutionClass, Tool, ToolDispatcher, ToolExecutionContext,
    ToolRegistry, ToolResult, ToolSource,
};
pub use storage::database::Database;
pub use utils::error::{AppError, AppResult};
