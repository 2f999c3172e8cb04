//! Retry policy: wraps a task factory into a task that retries with backoff.
//!
//! The queue knows nothing about retries. `RetryPolicy::wrap` produces an
//! ordinary [`Task`] whose single run may call the factory several times;
//! the queue sees one entry holding one slot for the whole sequence.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use crate::error::BoxError;
use crate::typed::Task;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backoff {
    /// Always `initial_delay`.
    Fixed,
    /// `initial_delay * attempt`.
    Linear,
    /// `initial_delay * 2^(attempt - 1)`.
    #[default]
    Exponential,
}

/// Retry policy for failing tasks.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound applied before jitter.
    pub max_delay: Duration,

    pub backoff: Backoff,

    /// Add a random 0-25% on top of each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Self::default()
        }
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed).
    ///
    /// Example with initial_delay=1s, exponential:
    /// - attempt 1: 1s
    /// - attempt 2: 2s
    /// - attempt 3: 4s
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base = self.initial_delay.as_secs_f64();
        let secs = match self.backoff {
            Backoff::Fixed => base,
            Backoff::Linear => base * f64::from(attempt),
            Backoff::Exponential => base * 2f64.powi((attempt - 1).min(i32::MAX as u32) as i32),
        };
        let capped = secs.min(self.max_delay.as_secs_f64());
        // f64 rounding can push a cap near Duration::MAX out of range.
        let delay = Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay);

        if self.jitter {
            let factor = 1.0 + rand::thread_rng().gen_range(0.0..0.25);
            Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
        } else {
            delay
        }
    }

    /// Wrap a task factory. The factory is called once per attempt.
    pub fn wrap<F>(&self, factory: F) -> Retrying<F> {
        Retrying {
            policy: self.clone(),
            factory,
            retry_if: None,
        }
    }
}

type RetryPredicate = Arc<dyn Fn(&BoxError) -> bool + Send + Sync>;

/// A task that re-runs its factory until it succeeds or the policy gives up.
///
/// Fails with the error of the last attempt.
pub struct Retrying<F> {
    policy: RetryPolicy,
    factory: F,
    retry_if: Option<RetryPredicate>,
}

impl<F> Retrying<F> {
    /// Only retry errors the predicate accepts; others fail immediately.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&BoxError) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Arc::new(predicate));
        self
    }

    fn should_retry(&self, attempt: u32, error: &BoxError) -> bool {
        attempt <= self.policy.max_retries
            && self.retry_if.as_ref().is_none_or(|predicate| predicate(error))
    }
}

#[async_trait]
impl<F, Fut, T, E> Task for Retrying<F>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Output = T;

    async fn run(self) -> Result<T, BoxError> {
        let mut this = self;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let error: BoxError = match (this.factory)().await {
                Ok(value) => return Ok(value),
                Err(error) => error.into(),
            };

            if !this.should_retry(attempt, &error) {
                return Err(error);
            }

            let delay = this.policy.next_delay(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Flaky(&'static str);

    #[test]
    fn default_policy_has_reasonable_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.backoff, Backoff::Exponential);
        assert!(!policy.jitter);
    }

    #[rstest]
    #[case::fixed(Backoff::Fixed, [100, 100, 100])]
    #[case::linear(Backoff::Linear, [100, 200, 300])]
    #[case::exponential(Backoff::Exponential, [100, 200, 400])]
    fn delay_grows_with_backoff(#[case] backoff: Backoff, #[case] expected_ms: [u64; 3]) {
        let policy = RetryPolicy::new(3, Duration::from_millis(100)).backoff(backoff);
        for (attempt, expected) in (1..=3).zip(expected_ms) {
            assert_eq!(policy.next_delay(attempt), Duration::from_millis(expected));
        }
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1)).max_delay(Duration::from_secs(5));
        assert_eq!(policy.next_delay(10), Duration::from_secs(5));
    }

    #[rstest]
    #[case::no_jitter(false)]
    #[case::jitter(true)]
    fn unbounded_delay_saturates(#[case] jitter: bool) {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(1))
            .max_delay(Duration::MAX)
            .jitter(jitter);
        for attempt in [64, 200, u32::MAX] {
            assert!(policy.next_delay(attempt) >= Duration::from_secs(1 << 62));
        }
    }

    #[test]
    fn jitter_on_maximal_delay_saturates() {
        let policy = RetryPolicy::new(1, Duration::MAX)
            .max_delay(Duration::MAX)
            .backoff(Backoff::Fixed)
            .jitter(true);
        assert_eq!(policy.next_delay(1), Duration::MAX);
    }

    #[test]
    fn jitter_adds_at_most_a_quarter() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000))
            .backoff(Backoff::Fixed)
            .jitter(true);
        for _ in 0..50 {
            let delay = policy.next_delay(1);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1250));
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let task = RetryPolicy::new(3, Duration::from_millis(1)).wrap(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(Flaky("not yet"))
                } else {
                    Ok(attempt)
                }
            }
        });

        assert_eq!(task.run().await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_with_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let task = RetryPolicy::new(2, Duration::from_millis(1)).wrap(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                Err::<(), _>(if attempt == 3 { Flaky("third") } else { Flaky("early") })
            }
        });

        let err = task.run().await.unwrap_err();
        assert_eq!(err.to_string(), "third");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn predicate_stops_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let task = RetryPolicy::new(5, Duration::from_millis(1))
            .wrap(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(Flaky("fatal")) }
            })
            .retry_if(|error| error.to_string() != "fatal");

        assert!(task.run().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
