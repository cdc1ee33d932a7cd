//! Completion Provider Trait
//!
//! Defines the common interface for streaming completion services. The
//! engine treats the service as an opaque capability: given history, tool
//! schemas, and a system instruction, it yields a stream of text
//! fragments, thought fragments, and function calls.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{CompletionRequest, LlmError, LlmResult, StreamUnit};

/// Trait that all completion providers must implement.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Open a completion stream for the given request.
    ///
    /// Errors at this boundary (authentication, rate limiting, transport)
    /// are returned directly so callers can apply retry policy. Once a
    /// receiver is returned, the stream yields units until the turn is
    /// complete; channel close marks end of stream.
    async fn stream(&self, request: CompletionRequest) -> LlmResult<mpsc::Receiver<StreamUnit>>;

    /// Check if the provider is healthy and reachable.
    async fn health_check(&self) -> LlmResult<()>;

    /// List available models (if supported by the provider).
    async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        Ok(None)
    }
}

/// Helper function to create an error for a missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to map HTTP error status codes to LlmError
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed {
            message: format!("{}: {}", provider, body),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
