//! Analyze Requirements Tool
//!
//! Deep requirement analysis over a user request: splits the request
//! into goals, constraints, and open questions, and cross-references the
//! knowledge store for related documents. Blocking class: downstream
//! steps depend on its result being settled.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use overseer_llm::ParameterSchema;

use crate::services::tools::registry::{
    ExecutionClass, Tool, ToolExecutionContext, ToolResult,
};

/// Words that mark a sentence as a constraint rather than a goal.
const CONSTRAINT_MARKERS: &[&str] = &[
    "must", "should", "cannot", "can't", "only", "never", "always", "without", "except",
];

/// Words that mark a sentence as an open question.
const QUESTION_MARKERS: &[&str] = &["?", "unclear", "unsure", "maybe", "perhaps"];

pub struct AnalyzeRequirementsTool;

impl AnalyzeRequirementsTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnalyzeRequirementsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for AnalyzeRequirementsTool {
    fn name(&self) -> &str {
        "analyze_requirements"
    }

    fn description(&self) -> &str {
        "Break a complex request down into goals, constraints, and open questions before planning or acting on it."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "request".to_string(),
            ParameterSchema::string(Some("The user request to analyze")),
        );
        ParameterSchema::object(
            Some("Analyze requirements parameters"),
            properties,
            vec!["request".to_string()],
        )
    }

    fn display_label(&self) -> String {
        "Analyzing requirements".to_string()
    }

    fn execution_class(&self) -> ExecutionClass {
        ExecutionClass::Blocking
    }

    async fn execute(&self, ctx: &ToolExecutionContext, args: Value) -> ToolResult {
        let request = match args.get("request").and_then(|v| v.as_str()) {
            Some(r) if !r.trim().is_empty() => r.trim(),
            _ => return ToolResult::err("Missing required parameter: request"),
        };

        ctx.report_progress("classifying sentences");

        let mut goals = Vec::new();
        let mut constraints = Vec::new();
        let mut questions = Vec::new();
        for sentence in split_sentences(request) {
            let lower = sentence.to_lowercase();
            if QUESTION_MARKERS.iter().any(|m| lower.contains(m)) {
                questions.push(sentence);
            } else if CONSTRAINT_MARKERS
                .iter()
                .any(|m| lower.split_whitespace().any(|w| w == *m))
            {
                constraints.push(sentence);
            } else {
                goals.push(sentence);
            }
        }

        ctx.report_progress("checking related knowledge");
        let related = ctx.knowledge.search(request, 3);

        let mut output = String::from("## Requirement analysis\n\n### Goals\n");
        if goals.is_empty() {
            output.push_str("- (none identified)\n");
        }
        for goal in &goals {
            output.push_str(&format!("- {}\n", goal));
        }
        output.push_str("\n### Constraints\n");
        if constraints.is_empty() {
            output.push_str("- (none identified)\n");
        }
        for constraint in &constraints {
            output.push_str(&format!("- {}\n", constraint));
        }
        if !questions.is_empty() {
            output.push_str("\n### Open questions\n");
            for question in &questions {
                output.push_str(&format!("- {}\n", question));
            }
        }
        if !related.is_empty() {
            output.push_str("\n### Related knowledge\n");
            for hit in &related {
                output.push_str(&format!("- {} ({})\n", hit.title, hit.doc_id));
            }
        }

        ToolResult::ok(output)
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
