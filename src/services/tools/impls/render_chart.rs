//! Render Chart Tool
//!
//! Accepts a chart payload from the model. The dispatcher forwards the
//! arguments verbatim over the chart-data callback; this executor only
//! validates shape. Silent: the chart surface renders the result.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use overseer_llm::ParameterSchema;

use crate::services::tools::registry::{Tool, ToolExecutionContext, ToolResult};

/// Chart kinds the UI can render.
const SUPPORTED_KINDS: &[&str] = &["bar", "line", "pie", "scatter", "area"];

pub struct RenderChartTool;

impl RenderChartTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RenderChartTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RenderChartTool {
    fn name(&self) -> &str {
        "render_chart"
    }

    fn description(&self) -> &str {
        "Render a chart from structured data. Use for any visualization request instead of describing the chart in text."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        let mut kind = ParameterSchema::string(Some("Chart kind"));
        kind.enum_values = Some(SUPPORTED_KINDS.iter().map(|s| s.to_string()).collect());
        properties.insert("kind".to_string(), kind);
        properties.insert(
            "title".to_string(),
            ParameterSchema::string(Some("Chart title")),
        );
        properties.insert(
            "labels".to_string(),
            ParameterSchema::array(
                Some("Category labels for the x axis"),
                ParameterSchema::string(None),
            ),
        );
        properties.insert(
            "values".to_string(),
            ParameterSchema::array(
                Some("Numeric values, one per label"),
                ParameterSchema::integer(None),
            ),
        );
        ParameterSchema::object(
            Some("Render chart parameters"),
            properties,
            vec!["kind".to_string(), "labels".to_string(), "values".to_string()],
        )
    }

    fn is_silent(&self) -> bool {
        true
    }

    async fn execute(&self, _ctx: &ToolExecutionContext, args: Value) -> ToolResult {
        let kind = match args.get("kind").and_then(|v| v.as_str()) {
            Some(k) => k,
            None => return ToolResult::err("Missing required parameter: kind"),
        };
        if !SUPPORTED_KINDS.contains(&kind) {
            return ToolResult::err(format!(
                "Unsupported chart kind '{}'. Supported: {}",
                kind,
                SUPPORTED_KINDS.join(", ")
            ));
        }

        let labels = args.get("labels").and_then(|v| v.as_array());
        let values = args.get("values").and_then(|v| v.as_array());
        match (labels, values) {
            (Some(labels), Some(values)) if labels.len() == values.len() && !labels.is_empty() => {
                ToolResult::ok(format!(
                    "Rendered a {} chart with {} data points",
                    kind,
                    labels.len()
                ))
            }
            (Some(_), Some(_)) => {
                ToolResult::err("labels and values must be non-empty and the same length")
            }
            _ => ToolResult::err("Missing required parameters: labels, values"),
        }
    }
}
