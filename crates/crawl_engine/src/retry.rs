//! Fixed-backoff retry loop with an injectable sleep.
//!
//! Every network-facing layer (listing, article resolution, asset download)
//! retries through [`retry_fixed`]. The sleep goes through a [`Sleeper`] so
//! tests can run retry-exhaustion scenarios without waiting on the clock.

use std::future::Future;
use std::time::Duration;

#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleep on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Classifies an error as worth another attempt.
///
/// Permanent failures (a 404 on an asset) stop the loop immediately.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Zero is treated as a single attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The error was not retryable; `attempt` is the 1-based attempt that hit it.
    Permanent { attempt: u32, error: E },
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Permanent { error, .. } => error,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

/// Runs `op` up to `policy.attempts()` times, sleeping `policy.backoff` between attempts.
///
/// `op` receives the 1-based attempt number. `on_retry` is called with each
/// retryable failure that will be followed by another attempt.
pub async fn retry_fixed<T, E, F, Fut>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
    mut on_retry: impl FnMut(u32, &E),
) -> Result<T, RetryError<E>>
where
    E: IsRetryable,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_retryable() => {
                return Err(RetryError::Permanent { attempt, error });
            }
            Err(error) if attempt >= attempts => {
                return Err(RetryError::Exhausted {
                    attempts,
                    last: error,
                });
            }
            Err(error) => {
                on_retry(attempt, &error);
                sleeper.sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}
