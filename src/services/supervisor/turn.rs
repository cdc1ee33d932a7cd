//! Turn State Machine
//!
//! Drives one turn through its states. Streaming suspends on the next
//! stream unit; ExecutingTools suspends on the two dispatcher groups;
//! every transition checks cancellation. Persistence happens at three
//! checkpoint kinds: after the user turn is appended, after each
//! completion round, and at the final UI-message fold.

use overseer_core::{dedup_steps, Plan, StepStatus, ThinkingStep};
use overseer_llm::{with_retry, CompletionRequest, Message, Part, StreamUnit};

use crate::models::session::{Session, SessionUpdate, UiMessage};
use crate::services::supervisor::{PlanResume, Supervisor, TurnOptions};
use crate::services::tools::{ResolvedToolCall, ToolExecutionContext};
use crate::utils::error::AppResult;
use crate::utils::text::first_line_capped;

/// Hard bound on completion-service round trips per turn. Reaching it
/// forces completion with whatever text has accumulated.
pub const MAX_TURN_ROUNDS: usize = 10;

/// Characters kept in the short summary line of a thought step.
const THOUGHT_SUMMARY_MAX_CHARS: usize = 80;

/// States of the per-turn machine.
enum TurnState {
    /// Append the user's input (or the plan-resume instruction)
    Sending,
    /// Open a completion stream and decode it
    Streaming,
    /// Run the collected tool calls through the dispatcher
    ExecutingTools(Vec<ResolvedToolCall>),
    /// Choose the next state from the batch outcome
    Deciding { plan_proposed: bool },
    /// Terminal
    Done,
}

/// Accumulates thought fragments for one open thought segment.
///
/// A segment opens on the first fragment after a close and is keyed by a
/// per-turn id, so every emission for the same segment updates the same
/// thinking step.
struct ThoughtBuffer {
    round: usize,
    seq: usize,
    id: Option<String>,
    buf: String,
}

impl ThoughtBuffer {
    fn new(round: usize) -> Self {
        Self {
            round,
            seq: 0,
            id: None,
            buf: String::new(),
        }
    }

    /// Append a fragment, opening a segment if none is active. Returns
    /// the Active step update to emit.
    fn append(&mut self, fragment: &str) -> ThinkingStep {
        if self.id.is_none() {
            self.seq += 1;
            self.id = Some(format!("thought-{}-{}", self.round, self.seq));
            self.buf.clear();
        }
        self.buf.push_str(fragment);
        self.step(StepStatus::Active)
    }

    /// Close the open segment, if any. Returns the final Completed step
    /// plus the full thought text for the history part.
    fn close(&mut self) -> Option<(ThinkingStep, String)> {
        self.id.as_ref()?;
        let step = self.step(StepStatus::Completed);
        self.id = None;
        Some((step, std::mem::take(&mut self.buf)))
    }

    fn step(&self, status: StepStatus) -> ThinkingStep {
        let id = self.id.clone().unwrap_or_default();
        ThinkingStep::new(id, "reasoning", "Thinking", status)
            .with_content(first_line_capped(&self.buf, THOUGHT_SUMMARY_MAX_CHARS))
            .with_detail(self.buf.clone())
    }
}

/// Everything one round of streaming produced.
struct StreamedRound {
    parts: Vec<Part>,
    calls: Vec<ResolvedToolCall>,
}

impl Supervisor {
    pub(super) async fn drive_turn(
        &self,
        mut session: Session,
        user_input: &str,
        resume: Option<PlanResume>,
        options: &TurnOptions,
    ) -> AppResult<String> {
        let cancellation = options.cancellation.clone().unwrap_or_default();
        let tool_ctx = ToolExecutionContext::new(
            &session.id,
            self.sessions(),
            std::sync::Arc::clone(&self.knowledge),
        )
        .with_cancellation(cancellation.clone());

        // Working copy of the history; every append is mirrored to the
        // store at the next checkpoint.
        let mut history = session.history.clone();
        let mut rounds = 0usize;
        let mut turn_text = String::new();
        let mut emitted_steps: Vec<ThinkingStep> = Vec::new();
        let mut files_written: Vec<String> = Vec::new();
        let mut charts: Vec<serde_json::Value> = Vec::new();
        let mut proposed_plan: Option<Plan> = None;

        let mut state = TurnState::Sending;
        loop {
            state = match state {
                TurnState::Sending => {
                    let (display, instruction) =
                        self.prepare_input(&session, user_input, resume.as_ref())?;
                    let user_turn = Message::user(instruction);
                    history.push(user_turn.clone());

                    let title = if session.messages.is_empty() {
                        session.title_from_input(&display);
                        Some(session.title.clone())
                    } else {
                        None
                    };
                    // Checkpoint: the user turn is durable before any
                    // stream is opened.
                    self.sessions.update(
                        &session.id,
                        SessionUpdate {
                            title,
                            append_history: vec![user_turn],
                            append_messages: vec![UiMessage::user(display)],
                            ..Default::default()
                        },
                    )?;
                    TurnState::Streaming
                }

                TurnState::Streaming => {
                    if cancellation.is_cancelled() {
                        TurnState::Done
                    } else if rounds >= self.config.max_rounds {
                        tracing::warn!(
                            session = %session.id,
                            "round bound ({}) reached, forcing completion",
                            self.config.max_rounds
                        );
                        TurnState::Done
                    } else {
                        rounds += 1;
                        let round = self
                            .stream_round(&history, rounds, &mut turn_text, &mut emitted_steps, options)
                            .await?;
                        if round.parts.is_empty() {
                            TurnState::Done
                        } else {
                            let model_turn = Message::model(round.parts);
                            history.push(model_turn.clone());
                            self.sessions.update(
                                &session.id,
                                SessionUpdate {
                                    append_history: vec![model_turn],
                                    ..Default::default()
                                },
                            )?;
                            TurnState::ExecutingTools(round.calls)
                        }
                    }
                }

                TurnState::ExecutingTools(calls) => {
                    if calls.is_empty() {
                        // This turn's answer is final.
                        TurnState::Done
                    } else {
                        let outcome = self
                            .dispatcher
                            .execute_batch(&tool_ctx, &self.sink, calls)
                            .await;

                        let response_turn = Message::tool_responses(outcome.responses);
                        history.push(response_turn.clone());
                        self.sessions.update(
                            &session.id,
                            SessionUpdate {
                                append_history: vec![response_turn],
                                ..Default::default()
                            },
                        )?;

                        if !outcome.files_written.is_empty() {
                            self.sink.files_written(outcome.files_written.clone());
                            files_written.extend(outcome.files_written);
                        }
                        charts.extend(outcome.charts);
                        emitted_steps.extend(outcome.steps);
                        let plan_proposed = outcome.proposed_plan.is_some();
                        if let Some(plan) = outcome.proposed_plan {
                            proposed_plan = Some(plan);
                        }
                        TurnState::Deciding { plan_proposed }
                    }
                }

                TurnState::Deciding { plan_proposed } => {
                    if cancellation.is_cancelled() || plan_proposed {
                        // A proposal ends the turn awaiting approval,
                        // regardless of what else ran.
                        TurnState::Done
                    } else {
                        // Every tool batch gets one more completion round
                        // so the model can incorporate the results.
                        TurnState::Streaming
                    }
                }

                TurnState::Done => break,
            };
        }

        // Fold the turn into one assistant UI message.
        let mut ui_message = UiMessage::assistant(turn_text.clone());
        ui_message.steps = dedup_steps(&emitted_steps);
        ui_message.plan = proposed_plan;
        ui_message.charts = charts.clone();
        ui_message.files_written = files_written;
        self.sessions.update(
            &session.id,
            SessionUpdate {
                append_messages: vec![ui_message],
                append_charts: charts,
                ..Default::default()
            },
        )?;

        Ok(turn_text)
    }

    /// Build the UI display text and the model instruction for this
    /// turn's input. A plan resume marks the stored plan approved and
    /// synthesizes an instruction listing the approved steps.
    fn prepare_input(
        &self,
        session: &Session,
        user_input: &str,
        resume: Option<&PlanResume>,
    ) -> AppResult<(String, String)> {
        let Some(resume) = resume else {
            return Ok((user_input.to_string(), user_input.to_string()));
        };

        let Some(mut plan) = session.plan.clone() else {
            // Resume without a stored plan degrades to a plain turn.
            tracing::warn!(session = %session.id, "plan resume without a stored plan");
            return Ok((user_input.to_string(), user_input.to_string()));
        };

        let approved_ids: Vec<String> = if resume.approved_step_ids.is_empty() {
            plan.steps.iter().map(|s| s.id.clone()).collect()
        } else {
            resume.approved_step_ids.clone()
        };
        plan.approve(&approved_ids);
        self.sessions.set_plan(&session.id, Some(plan.clone()))?;

        let mut instruction = format!(
            "The user approved the plan \"{}\". Execute the approved steps now, \
             reporting each with report_step_done:\n",
            plan.title
        );
        for step in plan.steps.iter().filter(|s| s.approved) {
            instruction.push_str(&format!("- [{}] {}\n", step.id, step.task));
        }

        let display = if user_input.trim().is_empty() {
            format!("Approved the plan \"{}\"", plan.title)
        } else {
            user_input.to_string()
        };
        Ok((display, instruction))
    }

    /// Open one completion stream (behind the retry wrapper) and decode
    /// it into parts, calls, and events.
    async fn stream_round(
        &self,
        history: &[Message],
        round: usize,
        turn_text: &mut String,
        emitted_steps: &mut Vec<ThinkingStep>,
        options: &TurnOptions,
    ) -> AppResult<StreamedRound> {
        let request = CompletionRequest {
            messages: history.to_vec(),
            system: Some(self.config.system_instruction.clone()),
            tools: self.registry.definitions(),
            options: options.request.clone(),
        };

        let mut rx = with_retry(
            || self.provider.stream(request.clone()),
            self.config.retry_attempts,
        )
        .await?;

        let mut parts: Vec<Part> = Vec::new();
        let mut calls: Vec<ResolvedToolCall> = Vec::new();
        let mut thought = ThoughtBuffer::new(round);

        let close_thought =
            |thought: &mut ThoughtBuffer, parts: &mut Vec<Part>, steps: &mut Vec<ThinkingStep>| {
                if let Some((step, text)) = thought.close() {
                    self.sink.thinking(step.clone());
                    steps.push(step);
                    parts.push(Part::Thought { text });
                }
            };

        while let Some(unit) = rx.recv().await {
            match unit {
                StreamUnit::ThoughtDelta { text } => {
                    let step = thought.append(&text);
                    self.sink.thinking(step.clone());
                    emitted_steps.push(step);
                }
                StreamUnit::TextDelta { text } => {
                    close_thought(&mut thought, &mut parts, emitted_steps);
                    turn_text.push_str(&text);
                    // Contiguous text fragments coalesce into one part.
                    if let Some(Part::Text { text: last }) = parts.last_mut() {
                        last.push_str(&text);
                    } else {
                        parts.push(Part::Text { text });
                    }
                    // The observer always receives the cumulative text.
                    self.sink.text(turn_text.clone());
                }
                StreamUnit::FunctionCall(request) => {
                    close_thought(&mut thought, &mut parts, emitted_steps);
                    let call_id = request
                        .call_id
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                    let call = ResolvedToolCall {
                        name: request.name,
                        call_id,
                        args: request.args,
                    };
                    parts.push(call.as_part());

                    let silent = self
                        .registry
                        .get(&call.name)
                        .map(|t| t.is_silent())
                        .unwrap_or(false);
                    if !silent {
                        let label = self
                            .registry
                            .get(&call.name)
                            .map(|t| t.display_label())
                            .unwrap_or_else(|| call.name.clone());
                        let step =
                            ThinkingStep::new(&call.call_id, &call.name, label, StepStatus::Pending);
                        self.sink.thinking(step.clone());
                        emitted_steps.push(step);
                    }
                    calls.push(call);
                }
            }
        }
        // Stream ended: a still-open thought closes as completed.
        close_thought(&mut thought, &mut parts, emitted_steps);

        Ok(StreamedRound { parts, calls })
    }
}
