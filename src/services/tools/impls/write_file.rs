//! Write File Tool
//!
//! Writes content into the session's virtual file table. Silent: the
//! file explorer surface renders the write, so no thinking step is
//! narrated. The entry is flagged writing-in-progress while the write is
//! underway so the UI can show a typing effect.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use overseer_llm::ParameterSchema;

use crate::models::session::VirtualFile;
use crate::services::tools::registry::{Tool, ToolExecutionContext, ToolResult};

pub struct WriteFileTool;

impl WriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in the session workspace. Creates the file if it doesn't exist, overwrites if it does."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("Workspace-relative path of the file to write")),
        );
        properties.insert(
            "content".to_string(),
            ParameterSchema::string(Some("The full content to write")),
        );
        properties.insert(
            "language".to_string(),
            ParameterSchema::string(Some("Optional display language hint (e.g. \"markdown\")")),
        );
        ParameterSchema::object(
            Some("Write file parameters"),
            properties,
            vec!["path".to_string(), "content".to_string()],
        )
    }

    fn is_silent(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolExecutionContext, args: Value) -> ToolResult {
        let path = match args.get("path").and_then(|v| v.as_str()) {
            Some(p) if !p.trim().is_empty() => p.trim(),
            _ => return ToolResult::err("Missing required parameter: path"),
        };
        let content = match args.get("content").and_then(|v| v.as_str()) {
            Some(c) => c,
            None => return ToolResult::err("Missing required parameter: content"),
        };
        let language = args
            .get("language")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| language_from_extension(path));

        // Mark the entry in progress first so observers see the write
        // happening, then land the final content.
        let placeholder = VirtualFile {
            content: String::new(),
            language: language.clone(),
            is_writing: true,
        };
        if let Err(e) = ctx
            .sessions
            .write_virtual_file(&ctx.session_id, path, placeholder)
        {
            return ToolResult::err(format!("Failed to open virtual file: {}", e));
        }

        let file = VirtualFile {
            content: content.to_string(),
            language,
            is_writing: false,
        };
        match ctx.sessions.write_virtual_file(&ctx.session_id, path, file) {
            Ok(()) => {
                let line_count = content.lines().count();
                ToolResult::ok(format!("Wrote {} lines to {}", line_count, path))
                    .with_data(serde_json::json!({ "path": path }))
            }
            Err(e) => ToolResult::err(format!("Failed to write virtual file: {}", e)),
        }
    }
}

fn language_from_extension(path: &str) -> Option<String> {
    let ext = path.rsplit('.').next()?;
    let language = match ext {
        "md" | "markdown" => "markdown",
        "rs" => "rust",
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "json" => "json",
        "html" | "htm" => "html",
        "css" => "css",
        "sql" => "sql",
        "sh" => "shell",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "csv" => "csv",
        "txt" => "text",
        _ => return None,
    };
    Some(language.to_string())
}
