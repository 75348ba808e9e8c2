//! Retry with exponential backoff for transient channel failures
//!
//! Only the HTTP channel client retries, and only inside a single chunk send.
//! A retried send still counts as one chunk in the delivery report.
//!
//! # Example
//!
//! ```no_run
//! use reply_pacer::retry::{IsRetryable, with_retry};
//! use reply_pacer::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum SendError {
//!     Busy,
//!     Refused,
//! }
//!
//! impl std::fmt::Display for SendError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for SendError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, SendError::Busy)
//!     }
//! }
//!
//! # async fn example() -> Result<(), SendError> {
//! let config = RetryConfig::default();
//! let id = with_retry(&config, || async { Ok::<_, SendError>("msg-1") }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::TransportError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Classifies an error as transient or permanent
pub trait IsRetryable {
    /// Returns true if the same request may succeed when repeated
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            // Overloaded provider or dropped connection
            TransportError::Unavailable { .. } | TransportError::Network(_) => true,
            // Repeating these sends the same bad request again
            TransportError::Rejected { .. }
            | TransportError::Unauthorized { .. }
            | TransportError::MalformedResponse(_) => false,
        }
    }
}

/// Run `operation`, retrying retryable failures up to `config.max_attempts` times
///
/// The first retry waits `initial_delay`; each later wait is multiplied by
/// `backoff_multiplier` and capped at `max_delay`. With `jitter` enabled every
/// wait is stretched by a random factor in `[1.0, 2.0]`.
///
/// Returns the first success, or the last error once attempts are exhausted or
/// a non-retryable error occurs.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "send succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;
                let wait = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = wait.as_millis() as u64,
                    "send failed, retrying"
                );

                tokio::time::sleep(wait).await;
                delay = next_delay(delay, config);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(error = %e, attempts = attempt + 1, "send failed, retries exhausted");
                } else {
                    tracing::debug!(error = %e, "send failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    let secs = delay.as_secs_f64() * config.backoff_multiplier;
    Duration::try_from_secs_f64(secs)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Stretch `delay` by a uniform factor in `[1.0, 2.0]`
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    delay.mul_f64(1.0 + factor)
}
