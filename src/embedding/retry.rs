use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::{DEFAULT_EMBED_MAX_ATTEMPTS, DEFAULT_EMBED_RETRY_DELAY};

/// Fixed-delay retry policy for calls to external services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_EMBED_MAX_ATTEMPTS,
            delay: DEFAULT_EMBED_RETRY_DELAY,
        }
    }
}

/// Final error after every attempt failed.
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Attempts actually made.
    pub attempts: usize,
    /// Error returned by the last attempt.
    pub last_error: E,
}

impl RetryPolicy {
    /// Run `operation` until it succeeds or `max_attempts` is reached.
    ///
    /// The closure receives the 1-based attempt number. No delay follows the final attempt.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= max_attempts => {
                    return Err(Exhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed; retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn instant(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = instant(3)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(format!("failure {attempt}"))
                    } else {
                        Ok(vec![1, 2, 3])
                    }
                }
            })
            .await
            .expect("third attempt succeeds");
        assert_eq!(result, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let error = instant(3)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(format!("failure {attempt}")) }
            })
            .await
            .unwrap_err();
        assert_eq!(error.attempts, 3);
        assert_eq!(error.last_error, "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = AtomicUsize::new(0);
        let _ = instant(0)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("nope") }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts_but_not_after_the_last() {
        let policy = RetryPolicy::default();
        let started = tokio::time::Instant::now();
        let _ = policy
            .run(|_| async { Err::<(), _>("down") })
            .await;
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }
}
