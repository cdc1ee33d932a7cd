//! Session Models
//!
//! The durable per-session record: model-facing conversation history, the
//! UI-facing message list, the virtual file table, and metadata. The two
//! lists are independently ordered but causally aligned: one user UI
//! message corresponds to exactly one appended user turn in history, and
//! one assistant UI message to the model/tool turns of one engine turn.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use overseer_core::{Plan, ThinkingStep};
use overseer_llm::Message;

use crate::utils::text::truncate_chars;

/// Maximum characters of the first user input kept as the session title.
const TITLE_MAX_CHARS: usize = 64;

/// A file in the session's virtual file table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualFile {
    /// File content
    pub content: String,
    /// Display language hint (e.g. "markdown", "python")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Whether a write is currently streaming into this file
    #[serde(default)]
    pub is_writing: bool,
}

/// Role of a UI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    User,
    Assistant,
}

/// One entry in the UI-facing message list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    /// Who the message belongs to
    pub role: UiRole,
    /// Rendered text content
    pub content: String,
    /// Thinking steps attached to this message (deduped by id)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<ThinkingStep>,
    /// Plan attached to this message, if one was proposed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    /// Chart payloads attached to this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<serde_json::Value>,
    /// Paths of virtual files written while producing this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_written: Vec<String>,
    /// Creation timestamp (UTC)
    pub timestamp: DateTime<Utc>,
}

impl UiMessage {
    /// Create a plain user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: UiRole::User,
            content: content.into(),
            steps: Vec::new(),
            plan: None,
            charts: Vec::new(),
            files_written: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message with just text; attachments are set by
    /// the turn fold.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: UiRole::Assistant,
            content: content.into(),
            steps: Vec::new(),
            plan: None,
            charts: Vec::new(),
            files_written: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// A session todo entry, managed by the todo tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

/// The durable session document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque session identifier
    pub id: String,
    /// Display title (first user input, truncated)
    pub title: String,
    /// Creation timestamp (UTC)
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp (UTC)
    pub updated_at: DateTime<Utc>,
    /// Model-facing conversation history
    #[serde(default)]
    pub history: Vec<Message>,
    /// UI-facing message list
    #[serde(default)]
    pub messages: Vec<UiMessage>,
    /// Virtual file table: path -> file
    #[serde(default)]
    pub files: BTreeMap<String, VirtualFile>,
    /// Current plan, if one has been proposed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    /// Chart payloads produced across the session
    #[serde(default)]
    pub charts: Vec<serde_json::Value>,
    /// Todo list managed by the todo tool
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}

impl Session {
    /// Create an empty session with a fresh id.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: "New session".to_string(),
            created_at: now,
            updated_at: now,
            history: Vec::new(),
            messages: Vec::new(),
            files: BTreeMap::new(),
            plan: None,
            charts: Vec::new(),
            todos: Vec::new(),
        }
    }

    /// Derive a title from the first user input if none was set yet.
    pub fn title_from_input(&mut self, input: &str) {
        if self.messages.is_empty() {
            self.title = truncate_chars(input.trim(), TITLE_MAX_CHARS);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Lightweight listing entry for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Partial session update with per-field merge semantics.
///
/// History, UI messages, and charts append; the plan, the virtual file
/// table, and the todo list replace wholesale when present.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub append_history: Vec<Message>,
    pub append_messages: Vec<UiMessage>,
    pub append_charts: Vec<serde_json::Value>,
    pub files: Option<BTreeMap<String, VirtualFile>>,
    pub plan: Option<Option<Plan>>,
    pub todos: Option<Vec<TodoItem>>,
}

impl Session {
    /// Apply a partial update, bumping `updated_at`.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        self.history.extend(update.append_history);
        self.messages.extend(update.append_messages);
        self.charts.extend(update.append_charts);
        if let Some(files) = update.files {
            self.files = files;
        }
        if let Some(plan) = update.plan {
            self.plan = plan;
        }
        if let Some(todos) = update.todos {
            self.todos = todos;
        }
        self.updated_at = Utc::now();
    }
}
