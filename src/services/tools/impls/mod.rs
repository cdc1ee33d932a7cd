//! Builtin Tool Implementations

pub mod analyze;
pub mod plan;
pub mod render_chart;
pub mod search_knowledge;
pub mod todos;
pub mod write_file;

use std::sync::Arc;

use super::registry::ToolRegistry;

/// Register the full builtin tool suite on a registry.
pub fn register_builtin_tools(registry: &mut ToolRegistry) {
    registry.register(Arc::new(write_file::WriteFileTool::new()));
    registry.register(Arc::new(render_chart::RenderChartTool::new()));
    registry.register(Arc::new(search_knowledge::SearchKnowledgeTool::new()));
    registry.register(Arc::new(plan::ProposePlanTool::new()));
    registry.register(Arc::new(plan::ReportStepTool::new()));
    registry.register(Arc::new(analyze::AnalyzeRequirementsTool::new()));
    registry.register(Arc::new(todos::ManageTodosTool::new()));
}
