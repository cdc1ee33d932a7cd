//! Manage Todos Tool
//!
//! Session-scoped todo list: add, complete, and list entries. The list
//! is stored on the session document and replaced wholesale per update.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use overseer_llm::ParameterSchema;

use crate::models::session::{SessionUpdate, TodoItem};
use crate::services::tools::registry::{Tool, ToolExecutionContext, ToolResult};

pub struct ManageTodosTool;

impl ManageTodosTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ManageTodosTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ManageTodosTool {
    fn name(&self) -> &str {
        "manage_todos"
    }

    fn description(&self) -> &str {
        "Manage the session todo list: add an item, mark one done, or list everything."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        let mut action = ParameterSchema::string(Some("What to do"));
        action.enum_values = Some(vec![
            "add".to_string(),
            "complete".to_string(),
            "list".to_string(),
        ]);
        properties.insert("action".to_string(), action);
        properties.insert(
            "text".to_string(),
            ParameterSchema::string(Some("Todo text (for add)")),
        );
        properties.insert(
            "id".to_string(),
            ParameterSchema::string(Some("Todo id (for complete)")),
        );
        ParameterSchema::object(
            Some("Manage todos parameters"),
            properties,
            vec!["action".to_string()],
        )
    }

    fn display_label(&self) -> String {
        "Updating todos".to_string()
    }

    async fn execute(&self, ctx: &ToolExecutionContext, args: Value) -> ToolResult {
        let action = match args.get("action").and_then(|v| v.as_str()) {
            Some(a) => a,
            None => return ToolResult::err("Missing required parameter: action"),
        };

        let session = match ctx.sessions.get(&ctx.session_id) {
            Ok(s) => s,
            Err(e) => return ToolResult::err(format!("Failed to load session: {}", e)),
        };
        let mut todos = session.todos;

        match action {
            "add" => {
                let Some(text) = args.get("text").and_then(|v| v.as_str()) else {
                    return ToolResult::err("Missing required parameter: text");
                };
                let item = TodoItem {
                    id: format!("todo-{}", todos.len() + 1),
                    text: text.to_string(),
                    done: false,
                };
                let id = item.id.clone();
                todos.push(item);
                if let Err(e) = self.store(ctx, todos.clone()) {
                    return ToolResult::err(e);
                }
                ToolResult::ok(format!("Added {} ({})", id, render(&todos)))
            }
            "complete" => {
                let Some(id) = args.get("id").and_then(|v| v.as_str()) else {
                    return ToolResult::err("Missing required parameter: id");
                };
                let Some(item) = todos.iter_mut().find(|t| t.id == id) else {
                    return ToolResult::err(format!("No todo with id {}", id));
                };
                item.done = true;
                if let Err(e) = self.store(ctx, todos.clone()) {
                    return ToolResult::err(e);
                }
                ToolResult::ok(format!("Completed {} ({})", id, render(&todos)))
            }
            "list" => ToolResult::ok(render(&todos)),
            other => ToolResult::err(format!("Unknown action: {}", other)),
        }
    }
}

impl ManageTodosTool {
    fn store(&self, ctx: &ToolExecutionContext, todos: Vec<TodoItem>) -> Result<(), String> {
        ctx.sessions
            .update(
                &ctx.session_id,
                SessionUpdate {
                    todos: Some(todos),
                    ..Default::default()
                },
            )
            .map(|_| ())
            .map_err(|e| format!("Failed to store todos: {}", e))
    }
}

fn render(todos: &[TodoItem]) -> String {
    if todos.is_empty() {
        return "no todos".to_string();
    }
    todos
        .iter()
        .map(|t| format!("[{}] {} {}", if t.done { "x" } else { " " }, t.id, t.text))
        .collect::<Vec<_>>()
        .join("; ")
}
