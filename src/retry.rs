//! Retry policy for transient fetch failures.
//!
//! The policy is injected into the fetcher so callers (and tests) can bound
//! how long a flaky transfer is allowed to run. Only transient errors ever
//! reach the policy; storage and other fatal errors abort immediately.

use std::time::Duration;

/// Decision returned by the retry policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and surface the error.
    NoRetry,
    /// Try again after the given delay.
    RetryAfter(Duration),
}

/// Attempt ceiling plus a fixed delay between attempts.
///
/// `unbounded()` never gives up, relying on resume-from-file-size to make
/// eventual progress across attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    backoff: Duration,
}

impl RetryPolicy {
    /// Retry transient failures forever, with no delay between attempts.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            backoff: Duration::ZERO,
        }
    }

    /// Allow at most `max_attempts` attempts in total (including the first).
    pub fn limited(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            backoff: Duration::ZERO,
        }
    }

    /// Sleep this long before each re-attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Decide whether another attempt may run. `attempt` is 1-based and names
    /// the attempt that just failed.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        match self.max_attempts {
            Some(max) if attempt >= max => RetryDecision::NoRetry,
            _ => RetryDecision::RetryAfter(self.backoff),
        }
    }
}
