//! Fixed-delay retry policy.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::duration_secs;

/// Retry decision result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after a delay.
    RetryAfter(Duration),
    /// The outcome is final; do not retry.
    DoNotRetry,
    /// The outcome called for a retry but no attempts remain.
    Exhausted,
}

/// Result of [`RetryPolicy::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    /// Last observed outcome.
    pub value: T,
    /// Attempts performed, including the first.
    pub attempts: u32,
    /// `true` when the last outcome still asked for a retry.
    pub exhausted: bool,
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts.
    #[serde(default = "default_delay", with = "duration_secs")]
    pub delay: Duration,
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_delay() -> Duration {
    Duration::from_secs(15)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_delay(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy that never retries.
    #[must_use]
    pub const fn never() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Decide what to do after `attempt` (1-based) produced an outcome.
    #[must_use]
    pub const fn decide(&self, retryable: bool, attempt: u32) -> RetryDecision {
        if !retryable {
            return RetryDecision::DoNotRetry;
        }
        if attempt >= self.max_attempts {
            return RetryDecision::Exhausted;
        }
        RetryDecision::RetryAfter(self.delay)
    }

    /// Run `operation` until `should_retry` rejects its outcome or attempts run out.
    ///
    /// Sleeps [`delay`](Self::delay) between attempts, never after the last one.
    pub async fn run<T, F, Fut, P>(&self, mut operation: F, mut should_retry: P) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = T>,
        P: FnMut(&T) -> bool,
    {
        let mut attempt = 1;
        loop {
            let value = operation(attempt).await;
            match self.decide(should_retry(&value), attempt) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_secs = delay.as_secs(),
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::DoNotRetry => {
                    return RetryOutcome {
                        value,
                        attempts: attempt,
                        exhausted: false,
                    };
                }
                RetryDecision::Exhausted => {
                    return RetryOutcome {
                        value,
                        attempts: attempt,
                        exhausted: true,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use tokio::time::Instant;

    use super::*;

    #[test]
    fn decide_respects_bound() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(true, 1),
            RetryDecision::RetryAfter(Duration::from_secs(15))
        );
        assert_eq!(
            policy.decide(true, 4),
            RetryDecision::RetryAfter(Duration::from_secs(15))
        );
        assert_eq!(policy.decide(true, 5), RetryDecision::Exhausted);
        assert_eq!(policy.decide(false, 1), RetryDecision::DoNotRetry);
    }

    #[test]
    fn never_exhausts_immediately() {
        assert_eq!(RetryPolicy::never().decide(true, 1), RetryDecision::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_accepted_outcome() {
        let calls = Cell::new(0_u32);
        let started = Instant::now();
        let outcome = RetryPolicy::default()
            .run(
                |attempt| {
                    calls.set(calls.get() + 1);
                    async move { attempt }
                },
                |attempt| *attempt < 3,
            )
            .await;
        assert_eq!(outcome.value, 3);
        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.exhausted);
        assert_eq!(calls.get(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn run_reports_exhaustion_without_trailing_sleep() {
        let started = Instant::now();
        let outcome = RetryPolicy::default()
            .run(|attempt| async move { attempt }, |_| true)
            .await;
        assert_eq!(outcome.attempts, 5);
        assert!(outcome.exhausted);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
    }
}
