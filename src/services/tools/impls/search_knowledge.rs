//! Search Knowledge Tool
//!
//! On-demand keyword search of the session's knowledge store. Lets the
//! model pull relevant documents when needed instead of pre-injecting
//! knowledge context into every prompt.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use overseer_llm::ParameterSchema;

use crate::services::knowledge::KnowledgeHit;
use crate::services::tools::registry::{Tool, ToolExecutionContext, ToolResult};

/// Default number of hits returned.
const DEFAULT_TOP_K: usize = 5;

/// Upper bound on requested hits.
const MAX_TOP_K: usize = 20;

pub struct SearchKnowledgeTool;

impl SearchKnowledgeTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SearchKnowledgeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SearchKnowledgeTool {
    fn name(&self) -> &str {
        "search_knowledge"
    }

    fn description(&self) -> &str {
        "Search the knowledge base for relevant documents. Use this before answering questions about project-specific facts, data, or documents."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "query".to_string(),
            ParameterSchema::string(Some("Search query describing the information you need")),
        );
        properties.insert(
            "top_k".to_string(),
            ParameterSchema::integer(Some("Number of results to return (default 5, max 20)")),
        );
        ParameterSchema::object(
            Some("Search knowledge parameters"),
            properties,
            vec!["query".to_string()],
        )
    }

    fn display_label(&self) -> String {
        "Searching knowledge".to_string()
    }

    async fn execute(&self, ctx: &ToolExecutionContext, args: Value) -> ToolResult {
        let query = match args.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q.trim(),
            _ => return ToolResult::err("Missing required parameter: query"),
        };
        let top_k = args
            .get("top_k")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_TOP_K)
            .min(MAX_TOP_K);

        ctx.report_progress(format!("searching: {}", query));

        if ctx.knowledge.is_empty() {
            return ToolResult::ok(
                "The knowledge base is empty. No documents are available to search.",
            );
        }

        let hits = ctx.knowledge.search(query, top_k);
        if hits.is_empty() {
            return ToolResult::ok(format!("No relevant results found for query: {}", query));
        }
        ToolResult::ok(format_hits(&hits))
    }
}

/// Format hits into a readable markdown block.
fn format_hits(hits: &[KnowledgeHit]) -> String {
    let mut output = format!("Found {} results:\n\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        output.push_str(&format!(
            "### Result {} (score: {:.1}, source: {})\n{}\n\n{}\n\n---\n\n",
            i + 1,
            hit.score,
            hit.doc_id,
            hit.title,
            hit.snippet,
        ));
    }
    output
}
