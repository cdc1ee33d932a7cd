//! Scripted Mock Provider
//!
//! A deterministic `CompletionProvider` for tests and offline runs. Each
//! call to `stream` pops the next scripted round of units; optional
//! queued failures are returned before any round, which is how retry
//! behavior is exercised.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::provider::CompletionProvider;
use crate::types::{CompletionRequest, LlmResult, StreamUnit, LlmError};

/// Scripted mock completion provider.
pub struct MockProvider {
    rounds: Mutex<VecDeque<Vec<StreamUnit>>>,
    failures: Mutex<VecDeque<LlmError>>,
    /// When the script runs out, replay this round instead of ending empty
    repeat: Option<Vec<StreamUnit>>,
    attempts: AtomicU32,
}

impl MockProvider {
    /// Create a provider that plays the given rounds in order. Once the
    /// script is exhausted, further calls yield an empty stream.
    pub fn new(rounds: Vec<Vec<StreamUnit>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            failures: Mutex::new(VecDeque::new()),
            repeat: None,
            attempts: AtomicU32::new(0),
        }
    }

    /// Replay `round` forever once the script is exhausted.
    pub fn with_repeating(round: Vec<StreamUnit>) -> Self {
        Self {
            rounds: Mutex::new(VecDeque::new()),
            failures: Mutex::new(VecDeque::new()),
            repeat: Some(round),
            attempts: AtomicU32::new(0),
        }
    }

    /// Queue errors to be returned (in order) before any scripted round.
    pub fn fail_first(self, failures: Vec<LlmError>) -> Self {
        *self.failures.lock().unwrap_or_else(|e| e.into_inner()) = failures.into();
        self
    }

    /// Number of times `stream` has been called (including failures).
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, _request: CompletionRequest) -> LlmResult<mpsc::Receiver<StreamUnit>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return Err(err);
        }

        let round = {
            let mut rounds = self.rounds.lock().unwrap_or_else(|e| e.into_inner());
            rounds
                .pop_front()
                .or_else(|| self.repeat.clone())
                .unwrap_or_default()
        };

        let (tx, rx) = mpsc::channel(round.len().max(1));
        tokio::spawn(async move {
            for unit in round {
                if tx.send(unit).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, ToolCallRequest};

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user("hi")],
            system: None,
            tools: vec![],
            options: Default::default(),
        }
    }

    async fn drain(mut rx: mpsc::Receiver<StreamUnit>) -> Vec<StreamUnit> {
        let mut units = Vec::new();
        while let Some(unit) = rx.recv().await {
            units.push(unit);
        }
        units
    }

    #[tokio::test]
    async fn test_rounds_play_in_order() {
        let provider = MockProvider::new(vec![
            vec![StreamUnit::TextDelta {
                text: "first".to_string(),
            }],
            vec![StreamUnit::TextDelta {
                text: "second".to_string(),
            }],
        ]);

        let units = drain(provider.stream(request()).await.unwrap()).await;
        assert!(matches!(&units[0], StreamUnit::TextDelta { text } if text == "first"));

        let units = drain(provider.stream(request()).await.unwrap()).await;
        assert!(matches!(&units[0], StreamUnit::TextDelta { text } if text == "second"));

        // Script exhausted: empty stream
        let units = drain(provider.stream(request()).await.unwrap()).await;
        assert!(units.is_empty());
        assert_eq!(provider.attempts(), 3);
    }

    #[tokio::test]
    async fn test_repeating_round() {
        let provider = MockProvider::with_repeating(vec![StreamUnit::FunctionCall(
            ToolCallRequest {
                name: "search_knowledge".to_string(),
                call_id: None,
                args: serde_json::json!({"query": "x"}),
            },
        )]);

        for _ in 0..5 {
            let units = drain(provider.stream(request()).await.unwrap()).await;
            assert_eq!(units.len(), 1);
        }
        assert_eq!(provider.attempts(), 5);
    }

    #[tokio::test]
    async fn test_queued_failures_come_first() {
        let provider = MockProvider::new(vec![vec![StreamUnit::TextDelta {
            text: "ok".to_string(),
        }]])
        .fail_first(vec![LlmError::RateLimited {
            message: "slow down".to_string(),
            retry_after: None,
        }]);

        assert!(provider.stream(request()).await.is_err());
        let units = drain(provider.stream(request()).await.unwrap()).await;
        assert_eq!(units.len(), 1);
        assert_eq!(provider.attempts(), 2);
    }
}
