//! Retry loop: run a closure until success, a fatal error, give-up, or
//! cancellation.

use super::classify;
use super::error::SegmentError;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::cancel::CancelToken;

/// Why `run_with_retry` stopped without succeeding.
#[derive(Debug)]
pub enum RetryStop {
    /// The error's kind is never retried (e.g. a terminal HTTP status, a nil
    /// body, a storage failure).
    Fatal(SegmentError),
    /// The retry count exceeded the policy's `max_retry`.
    GaveUp { attempts: u32 },
    /// The shared cancellation token fired.
    Canceled,
}

/// Runs `attempt` (given the 1-based attempt number) until it returns `Ok`,
/// or the policy/cancellation says to stop. Sleeps for the backoff delay
/// between retryable failures.
pub fn run_with_retry<F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut attempt: F,
) -> Result<u32, RetryStop>
where
    F: FnMut(u32) -> Result<(), SegmentError>,
{
    let mut attempt_num = 1u32;
    loop {
        if cancel.is_canceled() {
            return Err(RetryStop::Canceled);
        }

        match attempt(attempt_num) {
            Ok(()) => return Ok(attempt_num),
            Err(SegmentError::Canceled) => return Err(RetryStop::Canceled),
            Err(e) => {
                let kind = classify::classify(&e);
                if kind == ErrorKind::Other {
                    return Err(RetryStop::Fatal(e));
                }
                match policy.decide(attempt_num, kind) {
                    RetryDecision::NoRetry => {
                        return Err(RetryStop::GaveUp {
                            attempts: attempt_num,
                        })
                    }
                    RetryDecision::RetryAfter(delay) => {
                        std::thread::sleep(delay);
                        attempt_num += 1;
                    }
                }
            }
        }
    }
}
