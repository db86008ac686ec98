use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// Per spec.md §4.4, HTTP status is never one of the retryable kinds here —
/// every status outside 206/adopted-200 is fatal to the attempt. Retries
/// exist only for transport-layer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Network-level failure (connection reset, DNS, partial transfer, etc.).
    Connection,
    /// Any other error; never retried.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy, per spec.md §4.4: 50ms base delay, 60-second
/// ceiling per wait, bounded by `max_retry` (default 10) total retries, i.e.
/// at most `max_retry + 1` HTTP attempts for a part.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retry: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: 10,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retry(max_retry: u32) -> Self {
        RetryPolicy {
            max_retry,
            ..Self::default()
        }
    }

    /// Decide whether attempt number `attempt` (1-based, the attempt that
    /// just failed) should be followed by another attempt.
    ///
    /// Returns `NoRetry` once `attempt` already exceeds `max_retry`, which
    /// caps total attempts at `max_retry + 1`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt > self.max_retry {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout | ErrorKind::Connection => {
                let exp = 1u32 << attempt.saturating_sub(1).min(16);
                let raw = self.base_delay.saturating_mul(exp);
                RetryDecision::RetryAfter(raw.min(self.max_delay))
            }
        }
    }
}
