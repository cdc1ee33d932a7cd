//! Overseer LLM
//!
//! The completion-service boundary of the Overseer engine: conversation
//! and stream-unit types, the `CompletionProvider` trait, the rate-limit
//! retry wrapper, an OpenAI-compatible SSE provider, and a scripted mock
//! provider for tests.

pub mod mock;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod types;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use provider::{missing_api_key_error, parse_http_error, CompletionProvider};
pub use retry::{with_retry, DEFAULT_MAX_ATTEMPTS};
pub use types::{
    CompletionRequest, LlmError, LlmResult, Message, ParameterSchema, Part, ProviderConfig,
    RequestOptions, Role, StreamUnit, ToolCallRequest, ToolDefinition,
};
