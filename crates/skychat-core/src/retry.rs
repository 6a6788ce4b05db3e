//! Fixed-attempt, fixed-delay retry around a single remote call.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::error::Transient;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Which failures are worth another attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryOn {
    /// Every failure is retried, whatever its kind.
    #[default]
    Any,
    /// Only network, timeout, rate-limit and 5xx failures are retried.
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
            retry_on: RetryOn::Any,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            retry_on: RetryOn::Any,
        }
    }

    pub fn with_retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    fn should_retry<E: Transient>(&self, err: &E) -> bool {
        match self.retry_on {
            RetryOn::Any => true,
            RetryOn::Transient => err.is_transient(),
        }
    }
}

/// Run `call` until it succeeds or the policy gives up.
///
/// Between failed attempts the task sleeps for `policy.delay`. When attempts
/// run out (or the failure isn't retryable under the policy) the last error
/// is returned as-is.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T, E>
where
    E: Transient,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_retries.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= attempts || !policy.should_retry(&err) {
                    return Err(err);
                }
                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
