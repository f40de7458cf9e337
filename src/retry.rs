// src/retry.rs
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Fixed-count, fixed-delay retry. No backoff growth, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRetry {
    /// Total attempts including the first one; 0 is treated as 1.
    pub attempts: u32,
    pub delay: Duration,
}

/// Last error after the retry budget ran out (or a non-retryable error).
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

impl FixedRetry {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Run `op` until it succeeds, fails with an error `retryable` rejects,
    /// or the attempt budget is spent. `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, R>(
        &self,
        what: &str,
        mut op: F,
        retryable: R,
    ) -> Result<T, Exhausted<E>>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        let max = self.attempts.max(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt >= max || !retryable(&e) {
                        return Err(Exhausted { attempts: attempt, last: e });
                    }
                    tracing::warn!(
                        what,
                        attempt,
                        max,
                        delay_secs = self.delay.as_secs_f64(),
                        error = %e,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}
