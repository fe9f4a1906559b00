use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::JournalResult, utils::clock::Clock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Linear,
    Exponential,
}

/// Bounded retry for network collaborators. Only errors flagged as retryable are repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    pub backoff_ms: u64,
    pub kind: BackoffKind,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 2000,
            kind: BackoffKind::Linear,
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(attempts: u32) -> Self {
        Self {
            attempts,
            backoff_ms: 0,
            kind: BackoffKind::Linear,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = Duration::from_millis(self.backoff_ms);
        match self.kind {
            BackoffKind::Linear => base * retry,
            BackoffKind::Exponential => base * 2u32.saturating_pow(retry.saturating_sub(1)),
        }
    }

    pub async fn run<T, F, Fut>(
        &self,
        clock: &dyn Clock,
        operation: &str,
        mut attempt: F,
    ) -> JournalResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = JournalResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut current = 1;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && current < attempts => {
                    let delay = self.delay_for(current);
                    warn!(operation, attempt = current, ?delay, "Transient failure, retrying: {e}");
                    clock.sleep(delay).await;
                    current += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
