use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::pacing::Pacer;

/// Errors the backoff wrapper knows how to classify.
pub trait RetryClassify {
    /// Rate-limit failures are retried; everything else propagates at once.
    fn is_rate_limited(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// `initial_backoff * 2^attempt`, saturating.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

/// Paces calls to the provider and retries rate-limited ones with
/// exponential backoff.
#[derive(Debug)]
pub struct RateLimiter {
    pacer: Arc<Pacer>,
    policy: RetryPolicy,
}

impl RateLimiter {
    pub fn new(min_delay: Duration, policy: RetryPolicy) -> Self {
        Self::with_pacer(Arc::new(Pacer::new(min_delay)), policy)
    }

    pub fn with_pacer(pacer: Arc<Pacer>, policy: RetryPolicy) -> Self {
        Self { pacer, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    /// Runs `operation` until it succeeds, fails with a non rate-limit
    /// error, or has been attempted `max_retries + 1` times. The final error
    /// is returned unmodified.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryClassify + Display,
    {
        let mut attempt = 0u32;
        loop {
            self.pacer.wait_turn().await;
            match operation().await {
                Ok(value) => {
                    self.pacer.mark_completed().await;
                    return Ok(value);
                }
                Err(err) if err.is_rate_limited() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "rate limited, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_rate_limited() {
                        tracing::error!(attempts = attempt + 1, error = %err, "rate limit retries exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum FakeError {
        TooManyRequests,
        BadRequest,
    }

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl RetryClassify for FakeError {
        fn is_rate_limited(&self) -> bool {
            matches!(self, FakeError::TooManyRequests)
        }
    }

    fn policy(max_retries: u32, initial_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(initial_ms),
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let p = policy(3, 1000);
        assert_eq!(p.backoff_for(0), Duration::from_millis(1000));
        assert_eq!(p.backoff_for(1), Duration::from_millis(2000));
        assert_eq!(p.backoff_for(2), Duration::from_millis(4000));
        assert_eq!(p.max_attempts(), 4);

        let huge = RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_secs(u64::MAX / 4),
        };
        assert_eq!(huge.backoff_for(4), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_is_attempted_max_retries_plus_one_times() {
        let limiter = RateLimiter::new(Duration::ZERO, policy(3, 100));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), FakeError> = limiter
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::TooManyRequests)
            })
            .await;

        assert_eq!(result, Err(FakeError::TooManyRequests));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_grow_exponentially() {
        let limiter = RateLimiter::new(Duration::ZERO, policy(3, 100));
        let stamps = Mutex::new(Vec::new());
        let log = &stamps;

        let _: Result<(), FakeError> = limiter
            .execute(move || async move {
                log.lock().unwrap().push(Instant::now());
                Err(FakeError::TooManyRequests)
            })
            .await;

        let stamps = stamps.into_inner().unwrap();
        let gaps: Vec<_> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let limiter = RateLimiter::new(Duration::ZERO, policy(3, 100));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), FakeError> = limiter
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::BadRequest)
            })
            .await;

        assert_eq!(result, Err(FakeError::BadRequest));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_rate_limits() {
        let limiter = RateLimiter::new(Duration::ZERO, policy(3, 100));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = limiter
            .execute(move || async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(FakeError::TooManyRequests),
                    n => Ok(n),
                }
            })
            .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_calls_respect_minimum_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(1000), policy(3, 100));
        let stamps = Mutex::new(Vec::new());
        let log = &stamps;

        for _ in 0..2 {
            let _: Result<(), FakeError> = limiter
                .execute(move || async move {
                    log.lock().unwrap().push(Instant::now());
                    Ok(())
                })
                .await;
        }

        let stamps = stamps.into_inner().unwrap();
        assert!(stamps[1] - stamps[0] >= Duration::from_millis(1000));
    }
}
