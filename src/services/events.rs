//! Event Channel
//!
//! Ordered push of turn events from the engine to its observer. The sink
//! wraps an unbounded channel so emitters never block mid-turn; a dropped
//! receiver silently discards events, which lets headless callers run a
//! turn without wiring an observer.

use tokio::sync::mpsc;

use overseer_core::{Plan, PlanStepStatus, ThinkingStep, TurnEvent};

/// Sending half of the event channel.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TurnEvent>,
}

impl EventSink {
    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push an event; delivery failures (observer gone) are ignored.
    pub fn emit(&self, event: TurnEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event observer dropped, discarding event");
        }
    }

    pub fn thinking(&self, step: ThinkingStep) {
        self.emit(TurnEvent::Thinking { step });
    }

    /// Cumulative text for the current turn (never a delta).
    pub fn text(&self, content: impl Into<String>) {
        self.emit(TurnEvent::Text {
            content: content.into(),
        });
    }

    pub fn plan_proposed(&self, plan: Plan) {
        self.emit(TurnEvent::PlanProposed { plan });
    }

    pub fn chart_data(&self, payload: serde_json::Value) {
        self.emit(TurnEvent::ChartData { payload });
    }

    pub fn files_written(&self, paths: Vec<String>) {
        self.emit(TurnEvent::FilesWritten { paths });
    }

    pub fn plan_step_update(&self, step_id: impl Into<String>, status: PlanStepStatus) {
        self.emit(TurnEvent::PlanStepUpdate {
            step_id: step_id.into(),
            status,
        });
    }

    pub fn done(&self) {
        self.emit(TurnEvent::Done);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(TurnEvent::Error {
            message: message.into(),
        });
    }
}
