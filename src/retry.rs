//! Bounded exponential backoff
//!
//! Every network leg (account lookup, remote signer, KMS) retries its own
//! transient failures through a [`RetryPolicy`]. Terminal errors return
//! immediately.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Errors that can say whether another attempt might succeed
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// HTTP statuses worth retrying: server errors, request timeout, throttling
pub fn is_transient_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

/// Retry limits and backoff bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 100,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = Duration::from_millis(self.base_backoff_ms);
        let exponential = base
            .checked_mul(1 << attempt.min(20))
            .unwrap_or(Duration::MAX);
        exponential.min(Duration::from_millis(self.max_backoff_ms))
    }

    /// Run `operation`, retrying transient failures with backoff
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt + 1,
                        self.max_retries + 1,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
