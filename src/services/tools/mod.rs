//! Tool subsystem: trait, registry, dispatcher, and builtin tools.

pub mod dispatcher;
pub mod impls;
pub mod registry;

pub use dispatcher::{
    DispatchOutcome, ResolvedToolCall, ToolDispatcher, CHART_TOOL, PROPOSE_PLAN_TOOL,
    REPORT_STEP_TOOL,
};
pub use impls::register_builtin_tools;
pub use registry::{
    ExecutionClass, ProgressNote, Tool, ToolExecutionContext, ToolRegistry, ToolResult, ToolSource,
};
