use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use wyckoff_models::RetryPolicyConfig;

/// Bounded-attempt policy: at most `max_attempts` invocations, a fixed
/// `delay` between attempts, and an optional per-attempt timeout that
/// counts as one failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            attempt_timeout: None,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn from_config(config: &RetryPolicyConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }
}

/// Why a single attempt failed.
#[derive(Error, Debug)]
pub enum AttemptError<E> {
    #[error("{0}")]
    Op(E),

    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),
}

/// All attempts exhausted. Carries the last error and how many attempts
/// were made, so callers can tell "never succeeded" from "never attempted".
#[derive(Error, Debug)]
#[error("failed after {attempts} attempt(s): {last_error}")]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs a fallible async operation under a `RetryPolicy`.
///
/// The operation is invoked with the 1-based attempt index. Every failure
/// is logged with that index; the executor sleeps `delay` between attempts
/// but never after the last one.
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> Result<T, RetryError<AttemptError<E>>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max = self.policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max {
            let outcome = match self.policy.attempt_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, op(attempt)).await {
                    Ok(result) => result.map_err(AttemptError::Op),
                    Err(_) => Err(AttemptError::TimedOut(timeout)),
                },
                None => op(attempt).await.map_err(AttemptError::Op),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        info!(label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!(label, attempt, max, error = %e, "Attempt failed");
                    last_error = Some(e);
                    if attempt < max {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        // last_error is always set: max_attempts >= 1 and every iteration
        // either returns or stores an error.
        Err(RetryError {
            attempts: max,
            last_error: last_error.unwrap_or(AttemptError::TimedOut(Duration::ZERO)),
        })
    }
}
