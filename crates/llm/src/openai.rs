//! OpenAI-Compatible Provider
//!
//! Streaming implementation of `CompletionProvider` against any
//! OpenAI-compatible chat-completions endpoint. Parses the SSE response
//! into unified stream units: `delta.content` becomes text fragments,
//! `delta.reasoning_content` becomes thought fragments, and tool-call
//! argument fragments are accumulated per index and flushed as complete
//! function calls.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::provider::{missing_api_key_error, parse_http_error, CompletionProvider};
use crate::types::{
    CompletionRequest, LlmError, LlmResult, Message, Part, ProviderConfig, Role, StreamUnit,
    ToolCallRequest, ToolDefinition,
};

/// Default chat-completions endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Capacity of the per-stream unit channel
const STREAM_CHANNEL_CAPACITY: usize = 100;

/// OpenAI-compatible streaming provider
pub struct OpenAiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Build the request body for the API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": request
                .options
                .temperature_override
                .unwrap_or(self.config.temperature),
            "stream": true,
        });

        let mut messages: Vec<serde_json::Value> = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }
        for msg in &request.messages {
            messages.extend(message_to_openai(msg));
        }
        body["messages"] = serde_json::json!(messages);

        if !request.tools.is_empty() {
            let tools: Vec<serde_json::Value> =
                request.tools.iter().map(tool_to_openai).collect();
            body["tools"] = serde_json::json!(tools);
        }

        body
    }
}

/// Convert one conversation turn to OpenAI chat messages.
///
/// A model turn with function calls maps to a single assistant message
/// with `tool_calls`; each function response in a user turn maps to its
/// own `tool` message. Thought parts are never sent back.
fn message_to_openai(message: &Message) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    match message.role {
        Role::User => {
            let mut text = String::new();
            for part in &message.parts {
                match part {
                    Part::Text { text: t } => text.push_str(t),
                    Part::FunctionResponse {
                        name,
                        call_id,
                        response,
                    } => {
                        out.push(serde_json::json!({
                            "role": "tool",
                            "tool_call_id": call_id,
                            "name": name,
                            "content": response.to_string(),
                        }));
                    }
                    _ => {}
                }
            }
            if !text.is_empty() {
                out.push(serde_json::json!({"role": "user", "content": text}));
            }
        }
        Role::Model => {
            let mut text = String::new();
            let mut tool_calls: Vec<serde_json::Value> = Vec::new();
            for part in &message.parts {
                match part {
                    Part::Text { text: t } => text.push_str(t),
                    Part::FunctionCall {
                        name,
                        call_id,
                        args,
                    } => {
                        tool_calls.push(serde_json::json!({
                            "id": call_id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": args.to_string(),
                            }
                        }));
                    }
                    _ => {}
                }
            }
            let mut msg = serde_json::json!({"role": "assistant"});
            msg["content"] = if text.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String(text)
            };
            if !tool_calls.is_empty() {
                msg["tool_calls"] = serde_json::json!(tool_calls);
            }
            out.push(msg);
        }
    }
    out
}

/// Convert a tool definition to the OpenAI function format
fn tool_to_openai(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

// ── SSE decoding ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SseChunk {
    #[serde(default)]
    choices: Vec<SseChoice>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    #[serde(default)]
    delta: SseDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SseDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<SseToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct SseToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<SseFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct SseFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates tool-call fragments across SSE chunks.
#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl PendingToolCall {
    fn into_request(self) -> ToolCallRequest {
        let args = if self.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&self.arguments).unwrap_or(serde_json::Value::Null)
        };
        ToolCallRequest {
            name: self.name,
            call_id: self.id,
            args,
        }
    }
}

/// Decoder state for one SSE stream.
#[derive(Debug, Default)]
struct SseDecoder {
    pending: BTreeMap<usize, PendingToolCall>,
}

impl SseDecoder {
    /// Decode one `data:` payload into zero or more stream units.
    fn decode(&mut self, payload: &str) -> Vec<StreamUnit> {
        let chunk: SseChunk = match serde_json::from_str(payload) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("skipping malformed SSE chunk: {}", e);
                return Vec::new();
            }
        };

        let mut units = Vec::new();
        for choice in chunk.choices {
            if let Some(text) = choice.delta.reasoning_content {
                if !text.is_empty() {
                    units.push(StreamUnit::ThoughtDelta { text });
                }
            }
            if let Some(text) = choice.delta.content {
                if !text.is_empty() {
                    units.push(StreamUnit::TextDelta { text });
                }
            }
            if let Some(deltas) = choice.delta.tool_calls {
                for delta in deltas {
                    let entry = self.pending.entry(delta.index).or_default();
                    if let Some(id) = delta.id {
                        entry.id = Some(id);
                    }
                    if let Some(function) = delta.function {
                        if let Some(name) = function.name {
                            entry.name = name;
                        }
                        if let Some(arguments) = function.arguments {
                            entry.arguments.push_str(&arguments);
                        }
                    }
                }
            }
            if choice.finish_reason.is_some() {
                units.extend(self.flush());
            }
        }
        units
    }

    /// Emit any accumulated tool calls as complete function-call units.
    fn flush(&mut self) -> Vec<StreamUnit> {
        std::mem::take(&mut self.pending)
            .into_values()
            .filter(|p| !p.name.is_empty())
            .map(|p| StreamUnit::FunctionCall(p.into_request()))
            .collect()
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream(&self, request: CompletionRequest) -> LlmResult<mpsc::Receiver<StreamUnit>> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let body = self.build_request_body(&request);

        let response = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status, &body_text, "openai"));
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!("completion stream transport error: {}", e);
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();
                    if payload.is_empty() || payload == "[DONE]" {
                        continue;
                    }
                    for unit in decoder.decode(payload) {
                        if tx.send(unit).await.is_err() {
                            return;
                        }
                    }
                }
            }

            // Flush calls whose finish_reason chunk never arrived
            for unit in decoder.flush() {
                if tx.send(unit).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let url = self
            .base_url()
            .replace("/chat/completions", "/models");
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, "openai"))
        }
    }
}
