//! Bounded retry of venue calls.
//!
//! The retry policy is explicit data, not a convention buried in loops:
//! (max attempts, fixed delay, operation). Each failed attempt fully
//! suspends the calling task for the delay; sibling operations may still
//! run concurrently at the caller's discretion.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::VenueError;

/// Attempt budget and inter-attempt delay for one retried stage.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// No delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

/// Why a retried stage gave up.
#[derive(Debug)]
pub struct RetryError {
    /// Attempts actually made before giving up.
    pub attempts: u32,
    /// The error from the final attempt. Non-retryable errors end the loop
    /// early, so this may arrive before the budget is spent.
    pub last: VenueError,
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// A [`VenueError::Transport`] failure sleeps the fixed delay and tries
/// again; any non-retryable error stops the loop immediately.
pub async fn retry_bounded<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VenueError>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempts >= policy.max_attempts {
                    return Err(RetryError {
                        attempts,
                        last: err,
                    });
                }
                if !policy.delay.is_zero() {
                    sleep(policy.delay).await;
                }
            }
        }
    }
}
