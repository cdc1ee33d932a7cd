//! Thinking Steps
//!
//! User-visible progress narration emitted while a turn is running.
//! Steps are keyed by id: re-emitting a step with the same id updates it
//! in place (last write wins). Consumers de-duplicate by id and order by
//! timestamp, never by delivery order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a thinking step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Active => write!(f, "active"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single unit of progress narration.
///
/// `origin` names the tool or agent that produced the step; `content` is
/// the short display line and `detail` an optional expanded payload
/// (full thought text, serialized tool output, error message).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingStep {
    /// Stable identifier; same-id emissions update the same step
    pub id: String,
    /// Tool or agent name that originated this step
    pub origin: String,
    /// Human-readable display label
    pub label: String,
    /// Short content line shown to the user
    pub content: String,
    /// Optional expanded detail payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Current status
    pub status: StepStatus,
    /// Emission timestamp (UTC)
    pub timestamp: DateTime<Utc>,
}

impl ThinkingStep {
    /// Create a step with the given id, origin, and label.
    pub fn new(
        id: impl Into<String>,
        origin: impl Into<String>,
        label: impl Into<String>,
        status: StepStatus,
    ) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
            label: label.into(),
            content: String::new(),
            detail: None,
            status,
            timestamp: Utc::now(),
        }
    }

    /// Set the content line.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Attach a detail payload.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Fold a stream of step emissions into the de-duplicated, time-ordered
/// list a UI message carries. Later emissions for the same id replace
/// earlier ones; the original position in time order is kept.
pub fn dedup_steps(emissions: &[ThinkingStep]) -> Vec<ThinkingStep> {
    let mut out: Vec<ThinkingStep> = Vec::new();
    for step in emissions {
        if let Some(existing) = out.iter_mut().find(|s| s.id == step.id) {
            *existing = step.clone();
        } else {
            out.push(step.clone());
        }
    }
    out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    out
}
