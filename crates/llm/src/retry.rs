//! Retry Wrapper
//!
//! Bounded exponential backoff for rate-limited completion calls. Applied
//! only at the stream-open boundary: tool executions have their own
//! per-call isolation and are never retried here.

use std::future::Future;
use std::time::Duration;

use crate::types::LlmResult;

/// Base delay before the first retry; each subsequent retry doubles it.
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Default number of guarded attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Run `op`, retrying on rate-limit errors with exponential backoff.
///
/// Up to `max_attempts` guarded attempts are made; a non-rate-limit error
/// propagates immediately. If every guarded attempt was rate-limited, one
/// final unguarded attempt is made after a last backoff sleep, and
/// whatever it produces, success or failure, is returned as-is.
pub async fn with_retry<T, F, Fut>(mut op: F, max_attempts: u32) -> LlmResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() => {
                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << attempt));
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off: {}",
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }

    // Every guarded attempt was rate-limited: try one more time and
    // propagate whatever happens.
    op().await
}
